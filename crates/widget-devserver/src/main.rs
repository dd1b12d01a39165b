//! widget-devserver: serves a calling widget's static files on localhost and
//! forwards its HubSpot API calls upstream with permissive CORS headers.

mod config;
mod cors;
mod error;
mod handler;
mod inspect;
mod proxy;
mod route;
mod server;
mod statics;

use config::{CliArgs, DevServerConfig};
use server::DevServer;

fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse(std::env::args().skip(1));
    let config_path = cli.resolved_config_path();

    // Load configuration, then apply CLI overrides
    let mut config = DevServerConfig::load(&config_path)?;
    let port_warning = cli.apply(&mut config);

    // The runtime must exist before tracing init: the gRPC exporter needs a reactor
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let tracing_guard = devserver_tracing::init_tracing(&config.tracing);

        if let Some(e) = port_warning {
            tracing::warn!(error = %e, port = config.server.port, "Ignoring port argument, using default port");
        }

        tracing::info!(
            config_path = %config_path,
            listen_address = %config.server.listen_address(),
            root_dir = %config.server.root_dir.display(),
            api_base_url = %config.upstream.api_base_url,
            calling_base_url = %config.upstream.calling_base_url,
            otlp_export = tracing_guard.exporting(),
            "Starting widget-devserver"
        );

        DevServer::new(config)?.run().await
    })
}
