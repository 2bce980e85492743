//! Transport and discovery client for the remote timezone service.
//!
//! The service speaks a small query-action HTTP API:
//!
//! - `?action=capabilities` - service metadata, also the discovery probe
//! - `?action=get&tzid=<id>` - one VTIMEZONE, conditional via `If-None-Match`
//! - `?action=list[&changedsince=...]` - JSON id list
//! - `?aliases` - properties-style `old=new` alias lines
//!
//! Discovery accepts either an absolute service URL or a bare host,
//! which is probed at `https://<host>/.well-known/timezone` following
//! at most ten redirects.
//!
//! [`TimeZoneSource`] is the seam the resolution engine consumes;
//! [`TzClient`] is its HTTP implementation. The client keeps no
//! per-call mutable state, so one instance may be shared across
//! threads.

pub mod client;
pub mod config;
pub mod source;
pub mod types;

pub use client::{MAX_DISCOVERY_REDIRECTS, TzClient};
pub use config::TransportConfig;
pub use source::TimeZoneSource;
pub use types::{Capabilities, CapabilityAction, TzFetch, TzListEntry, TzListResponse};
