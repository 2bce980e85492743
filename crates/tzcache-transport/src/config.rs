//! Transport configuration.

use std::time::Duration;

use tzcache_core::{TzError, TzResult};
use url::Url;

/// Configuration for the timezone service transport.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Service location: an absolute `http(s)` URL used as-is, or a
    /// bare host probed at `https://<host>/.well-known/timezone`.
    pub server: String,

    /// Request timeout.
    pub timeout: Duration,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// User agent string.
    pub user_agent: String,
}

impl TransportConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given server URL or host.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            verify_tls: true,
            user_agent: format!("tzcache/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables TLS verification (for testing only).
    pub fn with_insecure_tls(mut self) -> Self {
        self.verify_tls = false;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolves the configured server to the URL discovery starts from.
    pub fn initial_url(&self) -> TzResult<Url> {
        if let Ok(url) = Url::parse(&self.server)
            && matches!(url.scheme(), "http" | "https")
        {
            return Ok(url);
        }
        Url::parse(&format!("https://{}/.well-known/timezone", self.server)).map_err(|e| {
            TzError::configuration(format!("invalid timezone server {:?}", self.server))
                .with_source(e)
        })
    }
}
