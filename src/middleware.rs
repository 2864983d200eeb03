use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Instrument, debug, info_span};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags each request with an id: reused from the incoming header when
/// present, echoed on the response and recorded on the log span, so every
/// event of the request (including error responses) carries it.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = extract_or_generate_request_id(request.headers());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    debug!("Request {} processed", request_id);
    response
}

/// `req_<unix millis>_<process counter>`
pub fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    format!("req_{}_{}", timestamp, counter)
}

/// The caller's `x-request-id` if it is non-empty text, else a fresh id
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> String {
    if let Some(request_id) = headers.get(REQUEST_ID_HEADER)
        && let Ok(id) = request_id.to_str()
        && !id.is_empty()
    {
        return id.to_string();
    }

    generate_request_id()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_do_not_repeat() {
        let ids: HashSet<String> = (0..500).map(|_| generate_request_id()).collect();
        assert_eq!(ids.len(), 500);
        assert!(ids.iter().all(|id| id.starts_with("req_")));
    }

    #[test]
    fn test_caller_id_is_kept() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("edge-7f3a"));
        assert_eq!(extract_or_generate_request_id(&headers), "edge-7f3a");
    }

    #[test]
    fn test_missing_or_empty_header_gets_fresh_id() {
        assert!(extract_or_generate_request_id(&HeaderMap::new()).starts_with("req_"));

        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static(""));
        assert!(extract_or_generate_request_id(&headers).starts_with("req_"));
    }

    #[test]
    fn test_non_text_header_gets_fresh_id() {
        let mut headers = HeaderMap::new();
        headers.insert(
            REQUEST_ID_HEADER,
            HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );
        assert!(extract_or_generate_request_id(&headers).starts_with("req_"));
    }
}
