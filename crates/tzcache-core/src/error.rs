//! Error types for timezone resolution operations.
//!
//! All transport, parsing, and cache failures are wrapped into a single
//! [`TzError`] at the boundary, carrying a symbolic [`TzErrorCode`] plus
//! free-text detail. "Unknown timezone" is a distinct code from
//! transport failure so callers can tell "genuinely absent" apart from
//! "the network broke".

use std::fmt;
use thiserror::Error;

/// The symbolic reason code of a timezone error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TzErrorCode {
    /// The requested timezone id is not known to the service.
    UnknownTimezone,
    /// A time string did not match any accepted shape, or a conversion
    /// result fell outside the fixed-width format bounds.
    BadDate,
    /// A cache operation failed (e.g. poisoned lock).
    CacheError,
    /// Network error - connection failed, timeout, unexpected status.
    NetworkError,
    /// The server answered but the body could not be interpreted.
    InvalidResponse,
    /// Service discovery failed during initialization.
    DiscoveryFailed,
    /// Missing or invalid configuration.
    ConfigurationError,
}

impl TzErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError)
    }

    /// Returns a stable machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTimezone => "unknown_timezone",
            Self::BadDate => "bad_date",
            Self::CacheError => "cache_error",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::DiscoveryFailed => "discovery_failed",
            Self::ConfigurationError => "configuration_error",
        }
    }
}

impl fmt::Display for TzErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by the timezone resolution subsystem.
#[derive(Debug, Error)]
pub struct TzError {
    /// The error code categorizing this error.
    code: TzErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TzError {
    /// Creates a new error with the given code and message.
    pub fn new(code: TzErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unknown-timezone error.
    pub fn unknown_timezone(tzid: impl fmt::Display) -> Self {
        Self::new(
            TzErrorCode::UnknownTimezone,
            format!("timezone not known to the service: {}", tzid),
        )
    }

    /// Creates a bad-date error.
    pub fn bad_date(message: impl Into<String>) -> Self {
        Self::new(TzErrorCode::BadDate, message)
    }

    /// Creates a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(TzErrorCode::CacheError, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TzErrorCode::NetworkError, message)
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(TzErrorCode::InvalidResponse, message)
    }

    /// Creates a discovery error.
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::new(TzErrorCode::DiscoveryFailed, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(TzErrorCode::ConfigurationError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> TzErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for TzError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for timezone operations.
pub type TzResult<T> = Result<T, TzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_names() {
        assert_eq!(TzErrorCode::UnknownTimezone.as_str(), "unknown_timezone");
        assert_eq!(TzErrorCode::BadDate.as_str(), "bad_date");
        assert_eq!(TzErrorCode::CacheError.as_str(), "cache_error");
    }

    #[test]
    fn error_code_retryable() {
        assert!(TzErrorCode::NetworkError.is_retryable());
        assert!(!TzErrorCode::UnknownTimezone.is_retryable());
        assert!(!TzErrorCode::DiscoveryFailed.is_retryable());
    }

    #[test]
    fn unknown_timezone_message() {
        let err = TzError::unknown_timezone("Mars/Olympus");
        assert_eq!(err.code(), TzErrorCode::UnknownTimezone);
        assert!(err.message().contains("Mars/Olympus"));
    }

    #[test]
    fn error_display() {
        let err = TzError::bad_date("unparseable time: 2024");
        let display = format!("{}", err);
        assert!(display.contains("bad_date"));
        assert!(display.contains("unparseable time"));
    }

    #[test]
    fn error_with_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("connection reset");
        let err = TzError::network("fetch failed").with_source(io_err);
        assert!(err.source().is_some());
        assert!(err.is_retryable());
    }
}
