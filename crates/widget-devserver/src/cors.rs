//! Cross-origin headers stamped onto every response the server sends.
//!
//! Applied as a single response-mapping layer around the whole router, so
//! static files, forwarded responses, upstream errors, transport failures
//! and preflight answers all carry the same set exactly once.

use axum::response::Response;
use http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "*";

/// Preflight cache lifetime: 24 hours.
pub const MAX_AGE_SECS: &str = "86400";

/// Set the cross-origin headers, replacing any values already present
/// (including ones relayed from upstream). Idempotent.
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE_SECS));
}

/// Response-mapping middleware for `axum::middleware::map_response`.
pub async fn inject_cors(mut response: Response) -> Response {
    apply_cors_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sets_all_headers() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers);

        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], "*");
        assert_eq!(headers[ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[test]
    fn test_idempotent() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers);
        apply_cors_headers(&mut headers);

        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get_all(ACCESS_CONTROL_ALLOW_ORIGIN).iter().count(), 1);
    }

    #[test]
    fn test_replaces_upstream_values_and_keeps_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://app.hubspot.com"),
        );
        headers.append(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://other.example"),
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        apply_cors_headers(&mut headers);

        let origins: Vec<_> = headers.get_all(ACCESS_CONTROL_ALLOW_ORIGIN).iter().collect();
        assert_eq!(origins, vec!["*"]);
        assert_eq!(headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_inject_cors_middleware() {
        let response = inject_cors(Response::new(axum::body::Body::empty())).await;
        assert_eq!(response.headers()[ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
