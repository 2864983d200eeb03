/// Firewall
///
/// Runs in front of every handler. It performs the credential check on login
/// POSTs, handles the logout path entirely, and enforces role requirements
/// from the route table.
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use super::session::SessionHandle;
use super::users::AuthenticatedUser;
use crate::AppState;
use crate::config::Config;
use crate::error::AppError;
use crate::response::RequestContext;
use crate::routes::{Access, route_table};

/// Login forms are tiny; anything larger is rejected
const MAX_LOGIN_BODY: usize = 16 * 1024;

/// Fields posted by the login form
#[derive(Debug, Default, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox: present when checked
    #[serde(default)]
    pub remember_me: Option<String>,
}

impl LoginCredentials {
    pub fn remember_me(&self) -> bool {
        self.remember_me
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v != "0" && v != "false")
    }
}

/// Outcome of the role check for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    /// Anonymous request to a protected route
    LoginRequired,
    /// Authenticated, but without the named role
    Forbidden(&'static str),
}

pub struct Firewall {
    login_path: String,
    check_path: String,
    logout_path: String,
    home_route: String,
    rules: Vec<(String, &'static str)>,
}

impl Firewall {
    pub fn from_config(config: &Config) -> Self {
        let rules = route_table(config)
            .into_iter()
            .filter_map(|route| match route.access {
                Access::Role(role) => Some((route.path, role)),
                Access::Anonymous => None,
            })
            .collect();

        Self {
            login_path: config.firewall.login_path.clone(),
            check_path: config.firewall.check_path.clone(),
            logout_path: config.firewall.logout_path.clone(),
            home_route: config.home_route.clone(),
            rules,
        }
    }

    /// Whether the firewall answers this request itself
    pub fn intercepts(&self, method: &Method, path: &str) -> bool {
        path == self.logout_path || (method == Method::POST && path == self.check_path)
    }

    /// Role needed to reach `path`, if any
    pub fn required_role(&self, path: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|(rule_path, _)| rule_path == path)
            .map(|(_, role)| *role)
    }

    /// Decide whether `user` may reach `path`
    pub fn authorize(&self, user: Option<&AuthenticatedUser>, path: &str) -> AccessDecision {
        match (self.required_role(path), user) {
            (None, _) => AccessDecision::Allow,
            (Some(_), None) => AccessDecision::LoginRequired,
            (Some(role), Some(user)) if !user.has_role(role) => AccessDecision::Forbidden(role),
            (Some(_), Some(_)) => AccessDecision::Allow,
        }
    }

    async fn logout(&self, session: &SessionHandle, ctx: &RequestContext) -> Response {
        let mut session = session.lock().await;
        info!(user = session.username().unwrap_or("anonymous"), "logout");
        session.invalidate();
        Redirect::to(&ctx.url_for(&self.home_route)).into_response()
    }

    async fn check_login(
        &self,
        state: &AppState,
        session: &SessionHandle,
        ctx: &RequestContext,
        req: Request,
        next: axum::middleware::Next,
    ) -> Response {
        let (parts, body) = req.into_parts();
        let bytes = match to_bytes(body, MAX_LOGIN_BODY).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("unreadable login body: {}", e);
                return StatusCode::BAD_REQUEST.into_response();
            }
        };
        let credentials: LoginCredentials =
            serde_urlencoded::from_bytes(&bytes).unwrap_or_default();

        match state
            .users
            .authenticate(&credentials.username, &credentials.password)
        {
            Ok(user) => {
                info!(user = %user.username, "login succeeded");
                let mut session = session.lock().await;
                let target = session
                    .target_path
                    .take()
                    .unwrap_or_else(|| ctx.url_for(&self.home_route));
                session.login(user, credentials.remember_me());
                Redirect::to(&target).into_response()
            }
            Err(error) => {
                warn!(user = %credentials.username, %error, "login failed");
                let username =
                    Some(credentials.username.trim().to_string()).filter(|u| !u.is_empty());
                session.lock().await.record_failure(username, error);
                // Show the login form again with the failure
                next.run(Request::from_parts(parts, Body::from(bytes))).await
            }
        }
    }
}

/// Firewall middleware. Requires the session layer outside it.
pub async fn firewall_middleware(
    State(state): State<AppState>,
    req: Request,
    next: axum::middleware::Next,
) -> Response {
    let Some(session) = req.extensions().get::<SessionHandle>().cloned() else {
        return AppError::configuration("the firewall runs without a session layer")
            .into_response();
    };

    let path = req.uri().path().to_string();
    let ctx = RequestContext::from_parts(req.headers(), &state.config.base_path, &path);
    let firewall = &state.firewall;

    if path == firewall.logout_path {
        return firewall.logout(&session, &ctx).await;
    }

    if req.method() == Method::POST && path == firewall.check_path {
        return firewall.check_login(&state, &session, &ctx, req, next).await;
    }

    {
        let mut session = session.lock().await;
        let decision = firewall.authorize(session.user.as_ref(), &path);
        match decision {
            AccessDecision::Allow => {}
            AccessDecision::LoginRequired => {
                let target = req
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or(path.as_str());
                session.target_path = Some(ctx.url_for(target));
                return Redirect::to(&ctx.url_for(&firewall.login_path)).into_response();
            }
            AccessDecision::Forbidden(role) => {
                warn!(
                    user = session.username().unwrap_or_default(),
                    role,
                    path = %path,
                    "access denied"
                );
                return StatusCode::FORBIDDEN.into_response();
            }
        }
    }

    next.run(req).await
}
