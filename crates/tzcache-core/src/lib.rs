//! Core types for the tzcache timezone resolution subsystem.
//!
//! This crate holds everything the transport and service layers share:
//!
//! - [`TzId`] - opaque timezone identifier
//! - [`TzError`] - the single error type carrying a symbolic reason code
//! - [`EvictionCache`] - bounded, TTL-expiring store with pin support
//! - [`TimeZoneDefinition`] - parsed VTIMEZONE offset rules
//! - [`AliasTable`] - legacy-id to canonical-id mapping
//! - [`TimeSpec`] - classification of the accepted time-string shapes

pub mod alias;
pub mod cache;
pub mod error;
pub mod id;
pub mod rules;
pub mod timefmt;
pub mod tracing;

pub use alias::AliasTable;
pub use cache::EvictionCache;
pub use error::{TzError, TzErrorCode, TzResult};
pub use id::TzId;
pub use rules::{Observance, ObservanceKind, TimeZoneDefinition, UtcOffset};
pub use timefmt::{TimeSpec, format_utc};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
