//! Error types for configuration and the forwarding path.

use std::error::Error as StdError;
use std::fmt;

use crate::proxy::forward::UpstreamResponse;

/// Recoverable configuration problems. Never fatal: the caller logs and falls back.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid port number: {0:?}")]
    InvalidPort(String),
}

/// Why a forward did not produce a plain success.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The upstream answered with an error status. Its status, headers and
    /// body are relayed to the caller unchanged.
    #[error("upstream returned HTTP {}", .0.status)]
    UpstreamHttp(UpstreamResponse),

    /// No usable response: DNS, refused connection, TLS, timeout, or a body
    /// that could not be read.
    #[error("{message}")]
    Transport { kind: TransportKind, message: String },

    /// The request target could not be turned into an upstream URL.
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),
}

/// Coarse transport failure class. Recorded in logs; every kind is answered
/// the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Timeout,
    Connect,
    Body,
    Request,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportKind::Timeout => "timeout",
            TransportKind::Connect => "connect",
            TransportKind::Body => "body",
            TransportKind::Request => "request",
        };
        f.write_str(name)
    }
}

impl From<reqwest::Error> for ForwardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            return ForwardError::InvalidTarget(error_chain(&e));
        }

        let kind = if e.is_timeout() {
            TransportKind::Timeout
        } else if e.is_connect() {
            TransportKind::Connect
        } else if e.is_body() || e.is_decode() {
            TransportKind::Body
        } else {
            TransportKind::Request
        };

        ForwardError::Transport {
            kind,
            message: error_chain(&e),
        }
    }
}

/// Render an error with its sources, e.g.
/// `error sending request for url (...): client error (Connect): tcp connect error: Connection refused`.
///
/// reqwest's own `Display` stops at the outermost layer, which hides the useful part.
pub fn error_chain(e: &dyn StdError) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
