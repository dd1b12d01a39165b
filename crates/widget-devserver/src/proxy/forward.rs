//! Outbound request construction and the upstream call.
//!
//! Request and response bodies pass through as raw bytes. They are only ever
//! parsed on a side path for debug logging (see [`crate::inspect`]).

use std::borrow::Cow;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, Method, StatusCode};
use bytes::Bytes;
use tracing::{Instrument, Level};

use crate::config::UpstreamConfig;
use crate::error::ForwardError;
use crate::inspect;

/// Incoming headers that are never copied to the outbound request. The
/// transport recomputes `host` and `content-length`; the framing headers
/// belong to the inbound connection.
const STRIPPED_REQUEST_HEADERS: &[&str] = &["host", "content-length", "transfer-encoding", "connection"];

/// Path fragment that selects the calling-extensions host.
const CALLING_EXTENSIONS_FRAGMENT: &str = "calling/extensions";

/// The request as it will be sent upstream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// A complete upstream answer, body fully read.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends routed requests to the upstream API.
///
/// Holds no per-request state; clones share the underlying client.
#[derive(Clone)]
pub struct RequestForwarder {
    client: reqwest::Client,
    upstream: UpstreamConfig,
}

impl RequestForwarder {
    /// Build the outbound client from config.
    ///
    /// Certificate validation stays on unless `accept_invalid_certs` is set.
    /// Idle connections are not pooled, so nothing carries over between requests.
    pub fn new(upstream: UpstreamConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(upstream.timeout_secs))
            .pool_max_idle_per_host(0);

        if upstream.accept_invalid_certs {
            tracing::warn!("Upstream TLS certificate validation is DISABLED (local testing only)");
            builder = builder.danger_accept_invalid_certs(true);
        }
        if !upstream.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            upstream,
        })
    }

    /// Turn an incoming request into the request sent upstream.
    pub fn prepare(&self, method: &Method, target: &str, headers: &HeaderMap, body: Bytes) -> OutboundRequest {
        let body = (method_allows_body(method) && !body.is_empty()).then_some(body);

        OutboundRequest {
            method: method.clone(),
            url: resolve_target(target, &self.upstream),
            headers: outbound_headers(headers),
            body,
        }
    }

    /// Perform a single upstream call. No retries.
    ///
    /// Any status below 400 is a success. Error statuses come back as
    /// [`ForwardError::UpstreamHttp`] carrying the full upstream answer;
    /// failures with no answer at all are [`ForwardError::Transport`].
    pub async fn forward(&self, outbound: OutboundRequest, request_id: &str) -> Result<UpstreamResponse, ForwardError> {
        let span = devserver_tracing::upstream_forward_span!(request_id, &outbound.url);
        let start = Instant::now();

        async {
            tracing::info!(method = %outbound.method, url = %outbound.url, "Forwarding request upstream");
            if let Some(ref body) = outbound.body {
                if tracing::enabled!(Level::DEBUG) {
                    tracing::debug!(body = %inspect::render_body(body), "Request body");
                }
            }

            let result = self.send(outbound).await;
            let latency = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("latency_ms", latency);

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    if let ForwardError::Transport { kind, .. } = &e {
                        tracing::Span::current().record("error_kind", tracing::field::display(kind));
                    }
                    tracing::error!(error = %e, latency_ms = latency, "Upstream request failed");
                    return Err(e);
                }
            };

            tracing::Span::current().record("status", response.status.as_u16());
            if tracing::enabled!(Level::DEBUG) {
                tracing::debug!(body = %inspect::render_body(&response.body), "Response body");
            }

            if response.status.is_client_error() || response.status.is_server_error() {
                tracing::warn!(
                    status = response.status.as_u16(),
                    reason = response.status.canonical_reason().unwrap_or(""),
                    latency_ms = latency,
                    "Upstream returned an error status"
                );
                return Err(ForwardError::UpstreamHttp(response));
            }

            tracing::info!(status = response.status.as_u16(), latency_ms = latency, "Forward complete");
            Ok(response)
        }
        .instrument(span)
        .await
    }

    async fn send(&self, outbound: OutboundRequest) -> Result<UpstreamResponse, ForwardError> {
        let mut req_builder = self
            .client
            .request(outbound.method, outbound.url.as_str())
            .headers(outbound.headers);

        if let Some(body) = outbound.body {
            req_builder = req_builder.body(body);
        }

        let upstream_resp = req_builder.send().await?;
        let status = upstream_resp.status();
        let headers = upstream_resp.headers().clone();
        let body = upstream_resp.bytes().await?;

        Ok(UpstreamResponse { status, headers, body })
    }
}

/// Resolve the absolute upstream URL for a request target.
///
/// Targets that already carry an `http://` or `https://` scheme are used as
/// is. Anything else is a path: it goes to the calling-extensions host when
/// it mentions `calling/extensions`, otherwise to the general API host.
pub fn resolve_target(target: &str, upstream: &UpstreamConfig) -> String {
    if has_http_scheme(target) {
        return target.to_string();
    }

    let path: Cow<'_, str> = if target.starts_with('/') {
        Cow::Borrowed(target)
    } else {
        Cow::Owned(format!("/{target}"))
    };

    let base = if path.contains(CALLING_EXTENSIONS_FRAGMENT) {
        &upstream.calling_base_url
    } else {
        &upstream.api_base_url
    };

    format!("{}{}", base.trim_end_matches('/'), path)
}

fn has_http_scheme(target: &str) -> bool {
    let lower = target.get(..8).unwrap_or(target).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Copy every incoming header except the stripped set. Repeated headers keep
/// all their values.
pub fn outbound_headers(incoming: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(incoming.len());
    for (name, value) in incoming.iter() {
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

/// POST is the only body-carrying method that reaches the forwarding path;
/// keep in step with `SUPPORTED_METHODS` in `server.rs`.
pub fn method_allows_body(method: &Method) -> bool {
    *method == Method::POST
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn upstream() -> UpstreamConfig {
        UpstreamConfig::default()
    }

    #[test]
    fn test_absolute_target_used_verbatim() {
        let url = "https://api.hubapi.com/crm/v3/objects/contacts?limit=10";
        assert_eq!(resolve_target(url, &upstream()), url);

        let url = "HTTP://api.hubspot.com/x";
        assert_eq!(resolve_target(url, &upstream()), url);
    }

    #[test]
    fn test_calling_extensions_path_goes_to_calling_host() {
        assert_eq!(
            resolve_target("/api/calling/extensions/settings?portalId=1", &upstream()),
            "https://app-ap1.hubspot.com/api/calling/extensions/settings?portalId=1"
        );
    }

    #[test]
    fn test_other_paths_go_to_api_host() {
        assert_eq!(
            resolve_target("/crm/v3/objects?ref=api.hubapi.com", &upstream()),
            "https://api.hubspot.com/crm/v3/objects?ref=api.hubapi.com"
        );
        // Schemeless host-looking paths are still paths.
        assert_eq!(
            resolve_target("/api.hubapi.com/contacts", &upstream()),
            "https://api.hubspot.com/api.hubapi.com/contacts"
        );
    }

    #[test]
    fn test_relative_target_gets_leading_slash() {
        assert_eq!(
            resolve_target("engagements/v1", &upstream()),
            "https://api.hubspot.com/engagements/v1"
        );
    }

    #[test]
    fn test_trailing_slash_on_base_url() {
        let mut config = upstream();
        config.api_base_url = "http://127.0.0.1:9000/".to_string();
        assert_eq!(resolve_target("/a", &config), "http://127.0.0.1:9000/a");
    }

    #[test]
    fn test_host_and_content_length_not_copied() {
        let mut incoming = HeaderMap::new();
        incoming.insert("host", HeaderValue::from_static("localhost:8000"));
        incoming.insert("content-length", HeaderValue::from_static("17"));
        incoming.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        incoming.insert("connection", HeaderValue::from_static("keep-alive"));
        incoming.insert("authorization", HeaderValue::from_static("Bearer abc"));
        incoming.insert("content-type", HeaderValue::from_static("application/json"));
        incoming.append("x-trace", HeaderValue::from_static("one"));
        incoming.append("x-trace", HeaderValue::from_static("two"));

        let headers = outbound_headers(&incoming);

        assert!(headers.get("host").is_none());
        assert!(headers.get("content-length").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert!(headers.get("connection").is_none());
        assert_eq!(headers["authorization"], "Bearer abc");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers.get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn test_body_attached_only_when_method_allows() {
        let forwarder = RequestForwarder::new(upstream()).unwrap();
        let headers = HeaderMap::new();
        let body = Bytes::from_static(b"{\"a\":1}");

        let post = forwarder.prepare(&Method::POST, "/api/calling/extensions/x", &headers, body.clone());
        assert_eq!(post.body.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(post.url, "https://app-ap1.hubspot.com/api/calling/extensions/x");

        let get = forwarder.prepare(&Method::GET, "/api/calling/extensions/x", &headers, body);
        assert!(get.body.is_none());

        let empty_post = forwarder.prepare(&Method::POST, "/x", &headers, Bytes::new());
        assert!(empty_post.body.is_none());
    }

    #[test]
    fn test_method_allows_body() {
        assert!(method_allows_body(&Method::POST));
        assert!(!method_allows_body(&Method::PUT));
        assert!(!method_allows_body(&Method::GET));
        assert!(!method_allows_body(&Method::HEAD));
        assert!(!method_allows_body(&Method::OPTIONS));
    }
}
