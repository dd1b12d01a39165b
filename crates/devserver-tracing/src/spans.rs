//! Span builders for widget-devserver instrumentation.

/// Span for one request handled by the forwarding path.
///
/// Usage: `let span = proxy_request_span!(request_id, method, target);`
#[macro_export]
macro_rules! proxy_request_span {
    ($request_id:expr, $method:expr, $target:expr) => {
        tracing::info_span!(
            "proxy_request",
            request_id = %$request_id,
            method = %$method,
            target = %$target,
        )
    };
}

/// Span for the outbound call to the upstream API.
///
/// `status` and `latency_ms` are recorded when the upstream answers (or fails).
#[macro_export]
macro_rules! upstream_forward_span {
    ($request_id:expr, $url:expr) => {
        tracing::info_span!(
            "upstream_forward",
            request_id = %$request_id,
            url = %$url,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            error_kind = tracing::field::Empty,
        )
    };
}
