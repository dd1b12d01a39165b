//! The seam between dispatch and the two request handlers.

use std::future::Future;

use axum::extract::Request;
use axum::response::Response;

/// Something that can answer a routed request.
///
/// Implemented by [`crate::proxy::ProxyHandler`] and
/// [`crate::statics::StaticHandler`]. Handlers never fail: every error is
/// already turned into a response.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request) -> impl Future<Output = Response> + Send;
}
