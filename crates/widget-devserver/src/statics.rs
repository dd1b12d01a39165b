//! Static file serving from the configured root directory.

use std::path::Path;

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tower_http::services::ServeDir;

use crate::handler::RequestHandler;

/// Serves files under a root directory: content type from the extension,
/// `index.html` for directories, 404 for anything missing.
#[derive(Clone)]
pub struct StaticHandler {
    dir: ServeDir,
}

impl StaticHandler {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: ServeDir::new(root),
        }
    }
}

impl RequestHandler for StaticHandler {
    async fn handle(&self, request: Request) -> Response {
        let path = request.uri().path().to_string();
        let mut dir = self.dir.clone();

        match dir.try_call(request).await {
            Ok(response) => {
                tracing::debug!(path = %path, status = response.status().as_u16(), "Static response");
                response.map(Body::new)
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path, "Failed to read static file");
                (StatusCode::INTERNAL_SERVER_ERROR, "failed to read file").into_response()
            }
        }
    }
}
