//! Configuration types, layered loading, and command-line overrides.

use std::path::PathBuf;

use devserver_tracing::TracingConfig;
use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "widget-devserver.toml";
pub const DEFAULT_PORT: u16 = 8000;

/// Top-level configuration handed to [`crate::server::DevServer::new`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DevServerConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub tracing: TracingConfig,
}

/// Listener and static-root settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Directory served for every request that is not forwarded upstream.
    pub root_dir: PathBuf,

    /// Largest request body accepted on the forwarding path.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            root_dir: PathBuf::from("."),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Upstream API hosts and outbound transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL for relative targets that are not calling-extension paths.
    pub api_base_url: String,

    /// Base URL for relative targets whose path contains `calling/extensions`.
    pub calling_base_url: String,

    /// Host names whose appearance anywhere in a request target marks it for forwarding.
    pub proxied_hosts: Vec<String>,

    pub timeout_secs: u64,

    /// Skip upstream certificate validation. Local testing only.
    pub accept_invalid_certs: bool,

    /// Honour `HTTPS_PROXY`/`HTTP_PROXY`/`NO_PROXY` for outbound calls.
    pub use_system_proxy: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.hubspot.com".to_string(),
            calling_base_url: "https://app-ap1.hubspot.com".to_string(),
            proxied_hosts: vec![
                "app-ap1.hubspot.com".to_string(),
                "api.hubspot.com".to_string(),
                "api.hubapi.com".to_string(),
            ],
            timeout_secs: 60,
            accept_invalid_certs: false,
            use_system_proxy: true,
        }
    }
}

impl DevServerConfig {
    /// Load configuration from defaults, an optional TOML file, and the environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DEVSERVER_ prefix, __ for nesting)
    /// 2. TOML config file (skipped when absent)
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config: DevServerConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("DEVSERVER_").split("__"))
            .extract()?;

        Ok(config)
    }
}

/// Command-line arguments.
///
/// `widget-devserver [PORT] [--config PATH] [--root DIR] [--insecure-upstream-tls]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<String>,
    pub port: Option<String>,
    pub root_dir: Option<PathBuf>,
    pub insecure_upstream_tls: bool,
}

impl CliArgs {
    /// Parse arguments, excluding the program name.
    ///
    /// Unknown flags are ignored; only the first positional argument is read as the port.
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut cli = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => cli.config_path = args.next(),
                "--root" => cli.root_dir = args.next().map(PathBuf::from),
                "--insecure-upstream-tls" => cli.insecure_upstream_tls = true,
                _ if arg.starts_with("--") => {}
                _ => {
                    if cli.port.is_none() {
                        cli.port = Some(arg);
                    }
                }
            }
        }

        cli
    }

    /// Config file path: `--config`, then `DEVSERVER_CONFIG`, then the default name.
    pub fn resolved_config_path(&self) -> String {
        self.config_path
            .clone()
            .or_else(|| std::env::var("DEVSERVER_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Apply overrides on top of the loaded config.
    ///
    /// A port argument that does not parse leaves the configured port in place
    /// and is returned so the caller can log it once logging is up.
    pub fn apply(&self, config: &mut DevServerConfig) -> Option<ConfigError> {
        if let Some(ref root) = self.root_dir {
            config.server.root_dir = root.clone();
        }
        if self.insecure_upstream_tls {
            config.upstream.accept_invalid_certs = true;
        }

        match self.port.as_deref().map(parse_port) {
            Some(Ok(port)) => {
                config.server.port = port;
                None
            }
            Some(Err(e)) => Some(e),
            None => None,
        }
    }
}

pub fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::InvalidPort(raw.to_string()))
}
