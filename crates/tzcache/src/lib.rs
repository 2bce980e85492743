//! Timezone resolution and caching.
//!
//! This crate ties the pieces together:
//!
//! - [`TimeZoneService`] - the resolution engine: definition cache,
//!   alias chains, default-id state, and local-to-UTC conversion
//! - [`DateConversionCache`] - per-id date-to-UTC cache with the
//!   active default id pinned against eviction
//! - [`facade`] - the process-wide singleton entry point
//!
//! # Example
//!
//! ```rust,no_run
//! use tzcache::facade;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     facade::init("tz.example.com")?;
//!     let utc = facade::get_utc("20240301", Some("America/New_York"))?;
//!     assert_eq!(utc, "20240301T050000Z");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod datecache;
pub mod facade;
pub mod service;

pub use config::ServiceConfig;
pub use datecache::{ConversionStats, DateConversionCache};
pub use service::{MAX_ALIAS_HOPS, TaggedTimeZone, TimeZoneService};

pub use tzcache_core::{
    AliasTable, EvictionCache, TimeZoneDefinition, TzError, TzErrorCode, TzId, TzResult,
};
pub use tzcache_transport::{TimeZoneSource, TransportConfig, TzClient, TzFetch};
