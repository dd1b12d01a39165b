//! The forwarding path: build the outbound request, call upstream, relay
//! the answer or translate the failure.

pub mod forward;
pub mod relay;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::Instrument;
use uuid::Uuid;

use crate::handler::RequestHandler;
use forward::RequestForwarder;

/// Handles requests classified for forwarding.
#[derive(Clone)]
pub struct ProxyHandler {
    forwarder: RequestForwarder,
    max_body_bytes: usize,
}

impl ProxyHandler {
    pub fn new(forwarder: RequestForwarder, max_body_bytes: usize) -> Self {
        Self {
            forwarder,
            max_body_bytes,
        }
    }
}

impl RequestHandler for ProxyHandler {
    async fn handle(&self, request: Request) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let target = request.uri().to_string();
        let (parts, body) = request.into_parts();
        let span = devserver_tracing::proxy_request_span!(&request_id, &parts.method, &target);

        async {
            let body = match axum::body::to_bytes(body, self.max_body_bytes).await {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read request body");
                    return (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
                }
            };

            let outbound = self.forwarder.prepare(&parts.method, &target, &parts.headers, body);

            match self.forwarder.forward(outbound, &request_id).await {
                Ok(upstream) => relay::relay(upstream),
                Err(e) => e.into_response(),
            }
        }
        .instrument(span)
        .await
    }
}
