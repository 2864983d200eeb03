//! Outgoing cookie mutations and incoming cookie lookup.

use axum::http::{HeaderMap, HeaderValue, header};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// One `Set-Cookie` header to attach to a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieMutation {
    pub name: String,
    pub value: String,
    pub path: String,
    /// Empty means host-only (no Domain attribute)
    pub domain: String,
    /// `None` leaves the lifetime to the browser session
    pub max_age: Option<i64>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl CookieMutation {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: String::new(),
            max_age: None,
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Mutation that deletes `name` at `path`
    pub fn removal(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, "").path(path).max_age(0)
    }

    /// Render as a `Set-Cookie` header value
    pub fn header_value(&self) -> String {
        let mut cookie = format!("{}={}; Path={}", self.name, self.value, self.path);
        if !self.domain.is_empty() {
            cookie.push_str(&format!("; Domain={}", self.domain));
        }
        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site));
        cookie
    }

    /// Append to a response's headers. Values that are not valid header text
    /// are dropped with a warning.
    pub fn append_to(&self, headers: &mut HeaderMap) {
        match HeaderValue::from_str(&self.header_value()) {
            Ok(value) => {
                headers.append(header::SET_COOKIE, value);
            }
            Err(e) => {
                tracing::warn!(cookie = %self.name, "dropping unrepresentable cookie: {}", e);
            }
        }
    }
}

/// Cookie `Path` for a deployment mounted at `base_path` ("" is the host root)
pub fn cookie_scope(base_path: &str) -> String {
    if base_path.is_empty() {
        "/".to_string()
    } else {
        base_path.to_string()
    }
}

/// Find the value of cookie `name` in the request's `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let (cookie_name, value) = cookie.trim().split_once('=')?;
            (cookie_name == name).then(|| value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_defaults() {
        let cookie = CookieMutation::new("POLICY_ACCEPTED", "1").path("/app");
        assert_eq!(
            cookie.header_value(),
            "POLICY_ACCEPTED=1; Path=/app; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_header_value_with_domain_and_max_age() {
        let cookie = CookieMutation::new("sid", "abc")
            .domain("example.com")
            .max_age(60)
            .secure(true);
        assert_eq!(
            cookie.header_value(),
            "sid=abc; Path=/; Domain=example.com; Max-Age=60; HttpOnly; Secure; SameSite=Lax"
        );
    }

    #[test]
    fn test_removal() {
        let cookie = CookieMutation::removal("sid", "/");
        assert_eq!(cookie.header_value(), "sid=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    }

    #[test]
    fn test_cookie_scope() {
        assert_eq!(cookie_scope(""), "/");
        assert_eq!(cookie_scope("/app"), "/app");
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=value; sid=token-123"),
        );
        assert_eq!(read_cookie(&headers, "sid"), Some("token-123".to_string()));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(read_cookie(&headers, "b"), Some("2".to_string()));
    }

    #[test]
    fn test_append_to_keeps_existing_cookies() {
        let mut headers = HeaderMap::new();
        CookieMutation::new("a", "1").append_to(&mut headers);
        CookieMutation::new("b", "2").append_to(&mut headers);
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
