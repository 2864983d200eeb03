//! Inspectable response descriptions.
//!
//! Handlers that only redirect build a [`ResponseDescription`] instead of
//! mutating a response in place, so the outcome can be checked without an
//! HTTP stack. [`ResponseDescription::apply`] turns it into a real response.

use axum::{
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};

use crate::cookie::CookieMutation;
use crate::flash::{FlashMessage, FlashQueue};

/// Per-request values needed to build URLs and cookie scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Value of the Host header ("" if absent)
    pub host: String,
    /// Deployment path prefix ("" when mounted at the host root)
    pub base_path: String,
    /// Path of the current request
    pub path: String,
}

impl RequestContext {
    pub fn new(
        host: impl Into<String>,
        base_path: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            base_path: base_path.into(),
            path: path.into(),
        }
    }

    /// Build from the request headers and the configured base path
    pub fn from_parts(headers: &HeaderMap, base_path: &str, path: &str) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Self::new(host, base_path, path)
    }

    /// Prefix an application route with the deployment base path
    pub fn url_for(&self, route: &str) -> String {
        format!("{}{}", self.base_path, route)
    }
}

/// Redirect target plus header mutations and queued messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescription {
    pub redirect: String,
    pub cookies: Vec<CookieMutation>,
    pub flashes: Vec<FlashMessage>,
}

impl ResponseDescription {
    pub fn redirect_to(target: impl Into<String>) -> Self {
        Self {
            redirect: target.into(),
            cookies: Vec::new(),
            flashes: Vec::new(),
        }
    }

    pub fn with_cookie(mut self, cookie: CookieMutation) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn with_flash(mut self, message: FlashMessage) -> Self {
        self.flashes.push(message);
        self
    }

    /// Queue the flashes and build a 303 redirect carrying the cookies
    pub fn apply(self, queue: &mut impl FlashQueue) -> Response {
        for message in self.flashes {
            queue.push(message);
        }
        let mut response = Redirect::to(&self.redirect).into_response();
        for cookie in &self.cookies {
            cookie.append_to(response.headers_mut());
        }
        response
    }
}

/// Redirect to the application's home route
pub fn redirect_to_home(ctx: &RequestContext, home_route: &str) -> ResponseDescription {
    ResponseDescription::redirect_to(ctx.url_for(home_route))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    #[test]
    fn test_redirect_to_home_uses_base_path() {
        let ctx = RequestContext::new("example.com", "/app", "/app/policy/accept");
        assert_eq!(redirect_to_home(&ctx, "/").redirect, "/app/");

        let ctx = RequestContext::new("example.com", "", "/anything");
        assert_eq!(redirect_to_home(&ctx, "/home").redirect, "/home");
    }

    #[test]
    fn test_apply_moves_flashes_and_sets_cookies() {
        let description = ResponseDescription::redirect_to("/")
            .with_cookie(CookieMutation::new("a", "1"))
            .with_flash(FlashMessage::success("done"));

        let mut queue: Vec<FlashMessage> = Vec::new();
        let response = description.apply(&mut queue);

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert_eq!(
            response.headers().get(header::SET_COOKIE).unwrap(),
            "a=1; Path=/; HttpOnly; SameSite=Lax"
        );
        assert_eq!(queue, vec![FlashMessage::success("done")]);
    }
}
