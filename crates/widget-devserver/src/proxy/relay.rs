//! Writing upstream answers and forwarding failures back to the caller.
//!
//! Cross-origin headers are added by the router-level layer in
//! [`crate::cors`], after everything here has run.

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use super::forward::UpstreamResponse;
use crate::error::ForwardError;

/// Upstream response headers that describe the upstream connection's
/// framing and must not be copied onto ours.
const FRAMING_HEADERS: &[&str] = &["transfer-encoding", "connection"];

/// Relay an upstream response: status and body verbatim, headers minus framing.
pub fn relay(upstream: UpstreamResponse) -> Response {
    let UpstreamResponse { status, headers, body } = upstream;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    copy_headers(&headers, response.headers_mut());
    response
}

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter() {
        if FRAMING_HEADERS.contains(&name.as_str()) {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

impl IntoResponse for ForwardError {
    /// Upstream error statuses are relayed exactly like successes. Anything
    /// without an upstream answer becomes a plain-text 500 carrying the error
    /// message.
    fn into_response(self) -> Response {
        match self {
            ForwardError::UpstreamHttp(upstream) => relay(upstream),
            other => {
                let mut message = other.to_string();
                if message.is_empty() {
                    message = "upstream request failed".to_string();
                }
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportKind;
    use axum::http::HeaderValue;
    use bytes::Bytes;

    fn upstream_response(status: StatusCode, body: &'static [u8]) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("connection", HeaderValue::from_static("close"));
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        UpstreamResponse {
            status,
            headers,
            body: Bytes::from_static(body),
        }
    }

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap()
    }

    #[tokio::test]
    async fn test_relay_copies_status_headers_and_body() {
        let response = relay(upstream_response(StatusCode::CREATED, b"{\"id\": 7}"));

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert!(response.headers().get("transfer-encoding").is_none());
        assert!(response.headers().get("connection").is_none());
        assert_eq!(response.headers().get_all("set-cookie").iter().count(), 2);
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"{\"id\": 7}"));
    }

    #[tokio::test]
    async fn test_upstream_http_error_relayed_verbatim() {
        let err = ForwardError::UpstreamHttp(upstream_response(
            StatusCode::NOT_FOUND,
            b"{\"error\":\"not found\"}",
        ));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_bytes(response).await, Bytes::from_static(b"{\"error\":\"not found\"}"));
    }

    #[tokio::test]
    async fn test_transport_error_is_plain_text_500() {
        let err = ForwardError::Transport {
            kind: TransportKind::Connect,
            message: "tcp connect error: Connection refused".to_string(),
        };
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(
            body_bytes(response).await,
            Bytes::from_static(b"tcp connect error: Connection refused")
        );
    }

    #[tokio::test]
    async fn test_invalid_target_is_plain_text_500() {
        let err = ForwardError::InvalidTarget("relative URL without a base".to_string());
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(
            body_bytes(response).await,
            Bytes::from_static(b"invalid upstream target: relative URL without a base")
        );
    }

    #[tokio::test]
    async fn test_empty_transport_message_replaced() {
        let err = ForwardError::Transport {
            kind: TransportKind::Request,
            message: String::new(),
        };
        let body = body_bytes(err.into_response()).await;
        assert_eq!(body, Bytes::from_static(b"upstream request failed"));
    }
}
