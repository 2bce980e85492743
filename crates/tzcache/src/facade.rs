//! Process-wide entry point.
//!
//! Wraps a single [`TimeZoneService`] in a [`OnceLock`] so callers can
//! use free functions instead of threading a handle around. The
//! service is created exactly once by [`init`] (or [`init_with`] when
//! injecting a source); later init calls are no-ops. Calling anything
//! else before init is a configuration error, never a panic.

use std::sync::{Arc, OnceLock};

use tracing::debug;
use tzcache_core::{TimeZoneDefinition, TzError, TzId, TzResult};
use tzcache_transport::TimeZoneSource;

use crate::config::ServiceConfig;
use crate::datecache::ConversionStats;
use crate::service::{TaggedTimeZone, TimeZoneService};

static SERVICE: OnceLock<TimeZoneService> = OnceLock::new();

/// Initializes the singleton against a timezone server.
///
/// Discovery runs at most once per process: the first successful call
/// wins and later calls return without touching the network.
///
/// # Errors
///
/// Fails when discovery fails; the singleton stays uninitialized and
/// init may be retried.
pub fn init(server: impl Into<String>) -> TzResult<()> {
    init_config(ServiceConfig::new(server))
}

/// Initializes the singleton with an explicit configuration.
pub fn init_config(config: ServiceConfig) -> TzResult<()> {
    if SERVICE.get().is_some() {
        debug!("timezone facade already initialized");
        return Ok(());
    }
    let engine = TimeZoneService::connect(config)?;
    let _ = SERVICE.set(engine);
    Ok(())
}

/// Initializes the singleton over an already-constructed source,
/// skipping discovery. Intended for embedding and tests.
pub fn init_with(config: ServiceConfig, source: Arc<dyn TimeZoneSource>) {
    let _ = SERVICE.set(TimeZoneService::new(config, source));
}

fn service() -> TzResult<&'static TimeZoneService> {
    SERVICE
        .get()
        .ok_or_else(|| TzError::configuration("timezone facade is not initialized"))
}

/// Returns the definition for an id. See [`TimeZoneService::get_timezone`].
pub fn get_timezone(tzid: &str) -> TzResult<Arc<TimeZoneDefinition>> {
    service()?.get_timezone(&TzId::new(tzid))
}

/// Conditionally fetches an id. See [`TimeZoneService::get_timezone_tagged`].
pub fn get_timezone_tagged(tzid: &str, etag: Option<&str>) -> TzResult<TaggedTimeZone> {
    service()?.get_timezone_tagged(&TzId::new(tzid), etag)
}

/// Converts a time string to UTC. See [`TimeZoneService::get_utc`].
pub fn get_utc(time: &str, tzid: Option<&str>) -> TzResult<String> {
    let tzid = tzid.map(TzId::new);
    service()?.get_utc(time, tzid.as_ref())
}

/// Resolves an aliased id to canonical form.
pub fn unalias(tzid: &str) -> TzResult<Option<TzId>> {
    service()?.unalias(&TzId::new(tzid))
}

/// Returns the system default id.
pub fn system_default() -> TzResult<TzId> {
    Ok(service()?.system_default())
}

/// Sets the system default id.
pub fn set_system_default(tzid: &str) -> TzResult<()> {
    service()?.set_system_default(TzId::new(tzid))
}

/// Returns this thread's default override, if set.
pub fn thread_default() -> TzResult<Option<TzId>> {
    Ok(service()?.thread_default())
}

/// Sets or clears this thread's default override.
pub fn set_thread_default(tzid: Option<&str>) -> TzResult<()> {
    service()?.set_thread_default(tzid.map(TzId::new));
    Ok(())
}

/// Returns the sorted timezone id list.
pub fn list_names() -> TzResult<Arc<Vec<String>>> {
    service()?.list_names()
}

/// Clears the definition cache and the cached name list.
pub fn refresh() -> TzResult<()> {
    service()?.refresh()
}

/// Returns a snapshot of the conversion counters.
pub fn stats() -> TzResult<ConversionStats> {
    service()?.stats()
}
