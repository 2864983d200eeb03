//! Route table
//!
//! Every route the application answers is listed here with its access rule
//! and owner. The axum router and the firewall's role rules are both built
//! from this table.

use axum::{
    Router,
    handler::Handler,
    http::Method,
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodFilter, MethodRouter, any, on},
};
use tower_http::trace::TraceLayer;

use crate::auth::{firewall, login, session, users::ROLE_USER};
use crate::config::Config;
use crate::middleware::request_id_middleware;
use crate::{AppState, consent, pages};

/// Path of the policy accept action
pub const POLICY_ACCEPT_PATH: &str = "/policy/accept";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    Role(&'static str),
}

/// Who produces the response for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOwner {
    Application,
    /// Answered by the firewall; the mounted handler must never run
    Firewall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Home,
    AcceptPolicy,
    LoginView,
    LogoutStub,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub path: String,
    /// Empty means any method
    pub methods: Vec<Method>,
    pub access: Access,
    pub owner: RouteOwner,
    pub endpoint: Endpoint,
}

pub fn route_table(config: &Config) -> Vec<RouteSpec> {
    let firewall = &config.firewall;
    let mut routes = vec![
        RouteSpec {
            path: config.home_route.clone(),
            methods: vec![Method::GET],
            access: Access::Anonymous,
            owner: RouteOwner::Application,
            endpoint: Endpoint::Home,
        },
        RouteSpec {
            path: POLICY_ACCEPT_PATH.to_string(),
            methods: vec![Method::GET, Method::POST],
            access: Access::Role(ROLE_USER),
            owner: RouteOwner::Application,
            endpoint: Endpoint::AcceptPolicy,
        },
        RouteSpec {
            path: firewall.login_path.clone(),
            methods: vec![Method::GET, Method::POST],
            access: Access::Anonymous,
            owner: RouteOwner::Application,
            endpoint: Endpoint::LoginView,
        },
        RouteSpec {
            path: firewall.logout_path.clone(),
            methods: Vec::new(),
            access: Access::Anonymous,
            owner: RouteOwner::Firewall,
            endpoint: Endpoint::LogoutStub,
        },
    ];

    // Failed checks are forwarded to the login view
    if firewall.check_path != firewall.login_path {
        routes.push(RouteSpec {
            path: firewall.check_path.clone(),
            methods: vec![Method::POST],
            access: Access::Anonymous,
            owner: RouteOwner::Application,
            endpoint: Endpoint::LoginView,
        });
    }

    routes
}

fn method_filter(methods: &[Method]) -> Option<MethodFilter> {
    methods
        .iter()
        .filter_map(|m| MethodFilter::try_from(m.clone()).ok())
        .reduce(MethodFilter::or)
}

fn mount<H, T>(methods: &[Method], handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    match method_filter(methods) {
        Some(filter) => on(filter, handler),
        None => any(handler),
    }
}

/// Build the application router with its middleware stack
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new();

    for route in route_table(&state.config) {
        let method_router = match route.endpoint {
            Endpoint::Home => mount(&route.methods, pages::home),
            Endpoint::AcceptPolicy => mount(&route.methods, consent::accept),
            Endpoint::LoginView => mount(&route.methods, login::login),
            Endpoint::LogoutStub => mount(&route.methods, login::logout),
        };
        router = router.route(&route.path, method_router);
    }

    // Outermost last: trace, request id, session, firewall, handler
    router
        .layer(from_fn_with_state(
            state.clone(),
            firewall::firewall_middleware,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
