//! Consent Cookie Gate
//!
//! Records that a user accepted the site policy by issuing a
//! `POLICY_ACCEPTED=1` cookie. The server keeps no consent state of its own;
//! whether the banner is shown is decided from the cookie the client presents.

use axum::{Extension, extract::State, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::info;

use crate::AppState;
use crate::auth::session::SessionHandle;
use crate::cookie::{CookieMutation, cookie_scope, read_cookie};
use crate::flash::FlashMessage;
use crate::response::{RequestContext, ResponseDescription, redirect_to_home};

/// Name of the consent cookie
pub const POLICY_ACCEPTED: &str = "POLICY_ACCEPTED";

/// Translation key of the message shown after accepting
pub const POLICY_ACCEPTED_MESSAGE: &str = "policy.accepted";

/// Computes the path the consent cookie is scoped to.
///
/// Every accept for the same deployment must yield the same path, otherwise
/// the browser keeps several cookies and the banner reappears.
#[cfg_attr(test, mockall::automock)]
pub trait CookiePathResolver: Send + Sync {
    fn cookie_path(&self, ctx: &RequestContext) -> String;
}

/// Scopes the cookie to the deployment base path (`/` at the host root)
#[derive(Debug, Clone, Default)]
pub struct BasePathResolver;

impl CookiePathResolver for BasePathResolver {
    fn cookie_path(&self, ctx: &RequestContext) -> String {
        cookie_scope(&ctx.base_path)
    }
}

/// The client-held acceptance record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentRecord {
    pub accepted: bool,
    pub path: String,
    /// Empty means the current host
    pub domain: String,
}

impl ConsentRecord {
    pub fn accepted(path: impl Into<String>) -> Self {
        Self {
            accepted: true,
            path: path.into(),
            domain: String::new(),
        }
    }

    pub fn to_cookie(&self) -> CookieMutation {
        CookieMutation::new(POLICY_ACCEPTED, if self.accepted { "1" } else { "0" })
            .path(self.path.clone())
            .domain(self.domain.clone())
    }
}

pub struct ConsentGate {
    resolver: Arc<dyn CookiePathResolver>,
    home_route: String,
}

impl ConsentGate {
    pub fn new(resolver: Arc<dyn CookiePathResolver>, home_route: impl Into<String>) -> Self {
        Self {
            resolver,
            home_route: home_route.into(),
        }
    }

    /// Record acceptance: redirect home, set the consent cookie, queue a
    /// success message. Never fails and is safe to repeat.
    pub fn accept_policy(&self, ctx: &RequestContext) -> ResponseDescription {
        let record = ConsentRecord::accepted(self.resolver.cookie_path(ctx));

        redirect_to_home(ctx, &self.home_route)
            .with_cookie(record.to_cookie())
            .with_flash(FlashMessage::success(POLICY_ACCEPTED_MESSAGE))
    }

    /// Whether the request presents an accepted consent cookie
    pub fn is_accepted(&self, headers: &HeaderMap) -> bool {
        read_cookie(headers, POLICY_ACCEPTED).is_some_and(|value| value == "1")
    }
}

/// `GET|POST /policy/accept`
pub async fn accept(
    State(state): State<AppState>,
    Extension(session): Extension<SessionHandle>,
    ctx: RequestContext,
) -> Response {
    let description = state.consent.accept_policy(&ctx);
    let mut session = session.lock().await;
    info!(
        user = session.username().unwrap_or("anonymous"),
        "policy accepted"
    );
    description.apply(&mut *session)
}
