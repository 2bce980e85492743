//! The timezone resolution engine.
//!
//! [`TimeZoneService`] owns the definition cache, the alias table, the
//! default-identifier state, and the UTC conversion algorithm, driving
//! any [`TimeZoneSource`] (the HTTP client in production, fakes in
//! tests). One instance is created at process initialization and lives
//! for the process lifetime; there is no teardown.

use std::cell::RefCell;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, RwLock};

use chrono::NaiveTime;
use regex::Regex;
use tracing::{debug, info, warn};

use tzcache_core::{
    AliasTable, EvictionCache, TimeSpec, TimeZoneDefinition, TzError, TzId, TzResult, format_utc,
};
use tzcache_transport::{TimeZoneSource, TzClient, TzFetch};

use crate::config::ServiceConfig;
use crate::datecache::{ConversionStats, DateConversionCache};

/// Maximum alias-chain hops before resolution is abandoned.
pub const MAX_ALIAS_HOPS: usize = 100;

/// Result of a conditional, cache-bypassing fetch.
///
/// `raw` and `definition` are absent when the server reported the
/// content unchanged since the supplied etag; `etag` then echoes the
/// caller's token so it stays valid for the next fetch.
#[derive(Debug, Clone)]
pub struct TaggedTimeZone {
    /// Validation token for the definition, verbatim.
    pub etag: Option<String>,
    /// Raw iCalendar text, when content changed.
    pub raw: Option<String>,
    /// Parsed definition, when content changed.
    pub definition: Option<Arc<TimeZoneDefinition>>,
}

/// State guarded by the engine's conversion lock.
struct EngineState {
    definitions: EvictionCache<Arc<TimeZoneDefinition>>,
    dates: DateConversionCache,
}

/// The resolution engine.
pub struct TimeZoneService {
    source: Arc<dyn TimeZoneSource>,
    /// Serializes conversions and definition registration.
    state: Mutex<EngineState>,
    /// Loaded once per process, under its own lock.
    aliases: Mutex<Option<Arc<AliasTable>>>,
    /// Cached id list; cleared by refresh, reloaded on demand.
    names: Mutex<Option<Arc<Vec<String>>>>,
    system_default: RwLock<TzId>,
}

thread_local! {
    // Per-thread default override. Thread-scoped by contract, so it is
    // shared by every service instance on the same thread.
    static THREAD_DEFAULT: RefCell<Option<TzId>> = const { RefCell::new(None) };
}

impl TimeZoneService {
    /// Creates an engine over an already-constructed source.
    pub fn new(config: ServiceConfig, source: Arc<dyn TimeZoneSource>) -> Self {
        let dates = DateConversionCache::new(
            config.date_capacity,
            config.date_ttl,
            config.default_tzid.clone(),
        );
        Self {
            source,
            state: Mutex::new(EngineState {
                definitions: EvictionCache::new(config.definition_capacity, config.definition_ttl),
                dates,
            }),
            aliases: Mutex::new(None),
            names: Mutex::new(None),
            system_default: RwLock::new(config.default_tzid),
        }
    }

    /// Discovers the timezone service and creates an engine bound to it.
    ///
    /// # Errors
    ///
    /// Discovery failures are fatal; there is no degraded offline mode.
    pub fn connect(config: ServiceConfig) -> TzResult<Self> {
        let client = TzClient::discover(config.transport())?;
        info!(url = %client.base_url(), "timezone service connected");
        Ok(Self::new(config, Arc::new(client)))
    }

    fn lock_state(&self) -> TzResult<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|_| TzError::cache("engine state lock poisoned"))
    }

    /// Returns the definition for an id, fetching and caching on miss.
    ///
    /// # Errors
    ///
    /// `UnknownTimezone` when the service has no data for the id;
    /// transport failures keep their own codes.
    pub fn get_timezone(&self, tzid: &TzId) -> TzResult<Arc<TimeZoneDefinition>> {
        let mut state = self.lock_state()?;
        self.definition_locked(&mut state, tzid)
    }

    fn definition_locked(
        &self,
        state: &mut EngineState,
        tzid: &TzId,
    ) -> TzResult<Arc<TimeZoneDefinition>> {
        if let Some(def) = state.definitions.get(tzid.as_str()) {
            return Ok(def.clone());
        }

        match self.source.fetch_timezone(tzid, None)? {
            TzFetch::Found { vtimezone, .. } => {
                let def = Arc::new(TimeZoneDefinition::parse(&vtimezone)?);
                // Last successful fetch wins; at most one live
                // definition per id.
                state.definitions.insert(tzid.as_str(), def.clone());
                debug!(tzid = %tzid, "cached timezone definition");
                Ok(def)
            }
            TzFetch::Missing => Err(TzError::unknown_timezone(tzid)),
            TzFetch::NotModified => Err(TzError::invalid_response(
                "unconditional fetch answered not-modified",
            )),
        }
    }

    /// Conditionally fetches an id, bypassing the definition cache.
    pub fn get_timezone_tagged(
        &self,
        tzid: &TzId,
        etag: Option<&str>,
    ) -> TzResult<TaggedTimeZone> {
        match self.source.fetch_timezone(tzid, etag)? {
            TzFetch::Found { etag, vtimezone } => {
                let definition = Arc::new(TimeZoneDefinition::parse(&vtimezone)?);
                Ok(TaggedTimeZone {
                    etag,
                    raw: Some(vtimezone),
                    definition: Some(definition),
                })
            }
            TzFetch::NotModified => Ok(TaggedTimeZone {
                etag: etag.map(str::to_string),
                raw: None,
                definition: None,
            }),
            TzFetch::Missing => Err(TzError::unknown_timezone(tzid)),
        }
    }

    /// Resolves a possibly aliased id to its canonical form.
    ///
    /// Applies the two fixed legacy prefix normalizations, then walks
    /// the alias table. Returns `None` when the chain exceeds
    /// [`MAX_ALIAS_HOPS`] (a cycle, in practice).
    pub fn unalias(&self, tzid: &TzId) -> TzResult<Option<TzId>> {
        let table = self.alias_table()?;
        let mut current = normalize_legacy(tzid.as_str()).to_string();

        for _ in 0..MAX_ALIAS_HOPS {
            match table.canonical(&current) {
                None => return Ok(Some(TzId::new(current))),
                Some(next) if next == current => return Ok(Some(TzId::new(current))),
                Some(next) => current = next.to_string(),
            }
        }

        warn!(tzid = %tzid, "possible circular alias chain; abandoning resolution");
        Ok(None)
    }

    fn alias_table(&self) -> TzResult<Arc<AliasTable>> {
        let mut guard = self
            .aliases
            .lock()
            .map_err(|_| TzError::cache("alias table lock poisoned"))?;
        if let Some(table) = guard.as_ref() {
            return Ok(table.clone());
        }
        // First load happens under the lock, exactly once per process
        // unless it fails.
        let table = Arc::new(self.source.fetch_aliases()?);
        *guard = Some(table.clone());
        Ok(table)
    }

    /// Converts a time string to fixed-width UTC form.
    ///
    /// Accepts `yyyyMMdd`, `yyyyMMddThhmmss`, or `yyyyMMddThhmmssZ`
    /// (returned unchanged). A missing id falls back to the thread
    /// default, then the system default. Date-only inputs are served
    /// from the per-id date cache when possible.
    pub fn get_utc(&self, time: &str, tzid: Option<&TzId>) -> TzResult<String> {
        let (date_key, local) = match TimeSpec::classify(time)? {
            TimeSpec::Utc(_) => return Ok(time.to_string()),
            TimeSpec::Local(local) => (None, local),
            TimeSpec::Date(date) => (Some(time), date.and_time(NaiveTime::MIN)),
        };

        let tzid = match tzid {
            Some(tzid) => tzid.clone(),
            None => self.effective_default(),
        };

        // The conversion path is one critical section: lookup, fetch,
        // convert, store. Only date-keyed conversions touch the cache.
        let mut state = self.lock_state()?;
        if let Some(key) = date_key
            && let Some(cached) = state.dates.lookup(&tzid, key)
        {
            return Ok(cached);
        }
        let def = self.definition_locked(&mut state, &tzid)?;
        let utc = format_utc(def.to_utc(local))?;
        if let Some(key) = date_key {
            state.dates.store(&tzid, key, &utc);
        }
        Ok(utc)
    }

    /// Returns the system default id.
    pub fn system_default(&self) -> TzId {
        self.system_default
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Sets the system default id and moves the date cache pin to it.
    pub fn set_system_default(&self, tzid: TzId) -> TzResult<()> {
        {
            let mut guard = self
                .system_default
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = tzid.clone();
        }
        let mut state = self.lock_state()?;
        state.dates.set_default(&tzid);
        info!(tzid = %tzid, "system default timezone changed");
        Ok(())
    }

    /// Returns this thread's default override, if set.
    pub fn thread_default(&self) -> Option<TzId> {
        THREAD_DEFAULT.with(|cell| cell.borrow().clone())
    }

    /// Sets or clears this thread's default override.
    pub fn set_thread_default(&self, tzid: Option<TzId>) {
        THREAD_DEFAULT.with(|cell| *cell.borrow_mut() = tzid);
    }

    fn effective_default(&self) -> TzId {
        self.thread_default().unwrap_or_else(|| self.system_default())
    }

    /// Returns the sorted timezone id list, loading it on first use.
    pub fn list_names(&self) -> TzResult<Arc<Vec<String>>> {
        let mut guard = self
            .names
            .lock()
            .map_err(|_| TzError::cache("name list lock poisoned"))?;
        if let Some(names) = guard.as_ref() {
            return Ok(names.clone());
        }
        let list = self.source.fetch_list(None)?;
        let mut names: Vec<String> = list.timezones.into_iter().map(|tz| tz.tzid).collect();
        names.sort();
        debug!(count = names.len(), "loaded timezone name list");
        let names = Arc::new(names);
        *guard = Some(names.clone());
        Ok(names)
    }

    /// Clears the definition cache and the cached name list.
    ///
    /// Date caches are intentionally left untouched: cached
    /// conversions for an id outlive a definition refresh, bounded
    /// only by the date cache TTL. Construct a new service for a full
    /// reset.
    pub fn refresh(&self) -> TzResult<()> {
        let mut state = self.lock_state()?;
        state.definitions.clear();
        drop(state);

        let mut names = self
            .names
            .lock()
            .map_err(|_| TzError::cache("name list lock poisoned"))?;
        *names = None;

        info!("definition cache and name list cleared");
        Ok(())
    }

    /// Returns a snapshot of the conversion counters.
    pub fn stats(&self) -> TzResult<ConversionStats> {
        Ok(self.lock_state()?.dates.stats())
    }
}

impl std::fmt::Debug for TimeZoneService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeZoneService")
            .field("system_default", &self.system_default())
            .finish_non_exhaustive()
    }
}

static MOZILLA_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/mozilla\.org/[^/]+/").expect("valid regex"));
static OLSON_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/[^/]+/Olson_[^/]+/").expect("valid regex"));

/// Strips the two known historical id-prefix conventions.
fn normalize_legacy(id: &str) -> &str {
    if let Some(m) = MOZILLA_PREFIX.find(id) {
        return &id[m.end()..];
    }
    if let Some(m) = OLSON_PREFIX.find(id) {
        return &id[m.end()..];
    }
    id
}
