//! Logging setup for widget-devserver: fmt output to stderr, with optional
//! OTLP span export when a collector endpoint is configured.

pub mod config;
pub mod otlp;
pub mod spans;

pub use config::{OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
