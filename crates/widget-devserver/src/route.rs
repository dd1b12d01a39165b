//! Request-target classification: forward upstream or serve from disk.

/// Path fragment that always marks a request for forwarding.
pub const CALLING_EXTENSIONS_PATH: &str = "/api/calling/extensions/";

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Proxy,
    Static,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Proxy => "proxy",
            Route::Static => "static",
        }
    }
}

/// Classifies raw request targets. Only the target string is consulted;
/// method and headers never influence the decision.
#[derive(Debug, Clone)]
pub struct TargetRouter {
    /// Lower-cased host substrings.
    proxied_hosts: Vec<String>,
}

impl TargetRouter {
    pub fn new<I, S>(proxied_hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            proxied_hosts: proxied_hosts
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    /// Total: every target maps to exactly one route.
    pub fn classify(&self, target: &str) -> Route {
        let target = target.to_ascii_lowercase();

        let names_upstream_host = self
            .proxied_hosts
            .iter()
            .any(|host| target.contains(host.as_str()));

        if names_upstream_host || target.contains(CALLING_EXTENSIONS_PATH) {
            Route::Proxy
        } else {
            Route::Static
        }
    }
}
