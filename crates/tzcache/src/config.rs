//! Service configuration.

use std::time::Duration;

use tzcache_core::TzId;
use tzcache_transport::TransportConfig;

/// Configuration for a [`TimeZoneService`](crate::TimeZoneService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timezone server URL or bare host (see [`TransportConfig`]).
    pub server: String,

    /// Request timeout for service calls.
    pub timeout: Duration,

    /// Whether to verify TLS certificates.
    pub verify_tls: bool,

    /// Maximum number of cached definitions.
    pub definition_capacity: usize,

    /// How long a cached definition stays valid.
    pub definition_ttl: Duration,

    /// Maximum number of per-id date caches.
    pub date_capacity: usize,

    /// How long a per-id date cache stays valid.
    pub date_ttl: Duration,

    /// The initial system default timezone id.
    pub default_tzid: TzId,
}

impl ServiceConfig {
    /// Default definition cache capacity.
    pub const DEFAULT_DEFINITION_CAPACITY: usize = 500;

    /// Default per-id date cache capacity.
    pub const DEFAULT_DATE_CAPACITY: usize = 1000;

    /// Creates a configuration for the given server with defaults.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            timeout: Duration::from_secs(TransportConfig::DEFAULT_TIMEOUT_SECS),
            verify_tls: true,
            definition_capacity: Self::DEFAULT_DEFINITION_CAPACITY,
            definition_ttl: Duration::from_secs(60 * 60),
            date_capacity: Self::DEFAULT_DATE_CAPACITY,
            date_ttl: Duration::from_secs(6 * 60 * 60),
            default_tzid: TzId::new("Etc/UTC"),
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

    /// Sets the definition cache bounds.
    pub fn with_definition_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.definition_capacity = capacity;
        self.definition_ttl = ttl;
        self
    }

    /// Sets the date cache bounds.
    pub fn with_date_cache(mut self, capacity: usize, ttl: Duration) -> Self {
        self.date_capacity = capacity;
        self.date_ttl = ttl;
        self
    }

    /// Sets the initial system default timezone id.
    pub fn with_default_tzid(mut self, tzid: impl Into<TzId>) -> Self {
        self.default_tzid = tzid.into();
        self
    }

    /// Returns the transport configuration this service config implies.
    pub fn transport(&self) -> TransportConfig {
        let mut transport = TransportConfig::new(self.server.clone()).with_timeout(self.timeout);
        if !self.verify_tls {
            transport = transport.with_insecure_tls();
        }
        transport
    }
}
