//! Axum HTTP server: single dispatch entry point, CORS layer, listener,
//! graceful shutdown.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::DevServerConfig;
use crate::cors;
use crate::handler::RequestHandler;
use crate::proxy::forward::RequestForwarder;
use crate::proxy::ProxyHandler;
use crate::route::{Route, TargetRouter};
use crate::statics::StaticHandler;

/// Methods answered by the server. `OPTIONS` is handled before routing.
const SUPPORTED_METHODS: &[Method] = &[Method::GET, Method::HEAD, Method::POST];

/// Shared application state. Immutable after construction.
pub struct AppState {
    pub router: TargetRouter,
    pub proxy: ProxyHandler,
    pub statics: StaticHandler,
}

/// The dev server, built from an explicit configuration value.
pub struct DevServer {
    config: DevServerConfig,
    state: Arc<AppState>,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> anyhow::Result<Self> {
        let forwarder = RequestForwarder::new(config.upstream.clone())?;

        if !config.server.root_dir.is_dir() {
            tracing::warn!(
                root_dir = %config.server.root_dir.display(),
                "Static root is not a directory; file requests will return 404"
            );
        }

        let state = AppState {
            router: TargetRouter::new(&config.upstream.proxied_hosts),
            proxy: ProxyHandler::new(forwarder, config.server.max_body_bytes),
            statics: StaticHandler::new(&config.server.root_dir),
        };

        Ok(Self {
            config,
            state: Arc::new(state),
        })
    }

    /// Every request goes through `dispatch`; every response gets the CORS headers.
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .layer(middleware::map_response(cors::inject_cors))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        let listen_addr = self.config.server.listen_address();
        let listener = TcpListener::bind(&listen_addr).await?;

        tracing::info!(
            address = %listen_addr,
            root_dir = %self.config.server.root_dir.display(),
            "widget-devserver listening at http://{listen_addr}"
        );

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("widget-devserver stopped");
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

/// Single entry point: preflight, then route to the proxy or static handler.
async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let method = request.method().clone();

    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    if !SUPPORTED_METHODS.contains(&method) {
        tracing::debug!(method = %method, "Rejecting unsupported method");
        return (StatusCode::NOT_IMPLEMENTED, format!("unsupported method: {method}")).into_response();
    }

    let route = state.router.classify(&request.uri().to_string());
    tracing::debug!(method = %method, uri = %request.uri(), route = route.as_str(), "Routed request");

    match route {
        Route::Proxy => state.proxy.handle(request).await,
        Route::Static => state.statics.handle(request).await,
    }
}

/// Wait for SIGINT (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, draining connections..."),
        Err(e) => {
            // Keep serving; the process can still be killed.
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
