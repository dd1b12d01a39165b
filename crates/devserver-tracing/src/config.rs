//! Tracing configuration types.

use serde::Deserialize;

/// Logging and trace export settings (the `[tracing]` config section).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Service name attached to exported spans.
    pub service_name: String,

    /// OTLP collector endpoint (e.g. "http://localhost:4317").
    /// Unset means stderr logging only.
    pub otlp_endpoint: Option<String>,

    pub protocol: OtlpProtocol,

    /// `EnvFilter` directive, e.g. "info" or "widget_devserver=debug,info".
    pub log_level: String,
}

/// OTLP transport protocol.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "widget-devserver".to_string(),
            otlp_endpoint: None,
            protocol: OtlpProtocol::default(),
            log_level: "info".to_string(),
        }
    }
}
