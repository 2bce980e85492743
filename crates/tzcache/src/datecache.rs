//! Per-identifier date conversion cache.
//!
//! Maps an 8-character date key to its 16-character UTC datetime
//! string, one map per timezone id, layered on the bounded
//! [`EvictionCache`]. The entry for the active default id is pinned so
//! it survives eviction while that id remains the default; changing
//! the default merely moves the pin, it never discards the previous
//! entry.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;
use tzcache_core::{EvictionCache, TzId};

/// Counters for the date conversion path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Date conversions served from cache.
    pub hits: u64,
    /// Date conversions that had to be computed.
    pub misses: u64,
    /// Conversions stored into the cache.
    pub stored: u64,
}

/// Cache of date→UTC conversions, keyed by timezone id.
#[derive(Debug)]
pub struct DateConversionCache {
    caches: EvictionCache<HashMap<String, String>>,
    default_id: TzId,
    stats: ConversionStats,
}

impl DateConversionCache {
    /// Creates a cache for at most `capacity` ids with the given TTL;
    /// `default_id` starts out as the pinned identifier.
    pub fn new(capacity: usize, ttl: Duration, default_id: TzId) -> Self {
        Self {
            caches: EvictionCache::new(capacity, ttl),
            default_id,
            stats: ConversionStats::default(),
        }
    }

    /// Returns the id whose entry is pinned.
    pub fn default_id(&self) -> &TzId {
        &self.default_id
    }

    /// Moves the pin to a new default id.
    ///
    /// The previous default's entry is unpinned and left to normal
    /// eviction, so switching away and back loses nothing unless the
    /// entry ages out in between.
    pub fn set_default(&mut self, tzid: &TzId) {
        if *tzid == self.default_id {
            return;
        }
        self.caches.unpin(self.default_id.as_str());
        self.caches.pin(tzid.as_str());
        debug!(from = %self.default_id, to = %tzid, "moved date cache pin");
        self.default_id = tzid.clone();
    }

    /// Looks up a cached conversion, counting a hit or a miss.
    pub fn lookup(&mut self, tzid: &TzId, date: &str) -> Option<String> {
        let cached = self
            .caches
            .get(tzid.as_str())
            .and_then(|dates| dates.get(date))
            .cloned();
        match cached {
            Some(utc) => {
                self.stats.hits += 1;
                Some(utc)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Stores a computed conversion under the original date key.
    pub fn store(&mut self, tzid: &TzId, date: &str, utc: &str) {
        if let Some(dates) = self.caches.get_mut(tzid.as_str()) {
            dates.insert(date.to_string(), utc.to_string());
        } else {
            let mut dates = HashMap::new();
            dates.insert(date.to_string(), utc.to_string());
            self.caches.insert(tzid.as_str(), dates);
            if *tzid == self.default_id {
                self.caches.pin(tzid.as_str());
            }
        }
        self.stats.stored += 1;
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> ConversionStats {
        self.stats
    }

    /// Returns the number of resident per-id caches.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Returns true if no id has cached conversions.
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> DateConversionCache {
        DateConversionCache::new(2, Duration::from_secs(60), TzId::new("America/New_York"))
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = cache();
        let id = TzId::new("Europe/Paris");

        assert!(cache.lookup(&id, "20240301").is_none());
        cache.store(&id, "20240301", "20240229T230000Z");
        assert_eq!(
            cache.lookup(&id, "20240301").as_deref(),
            Some("20240229T230000Z")
        );
        assert_eq!(
            cache.stats(),
            ConversionStats {
                hits: 1,
                misses: 1,
                stored: 1
            }
        );
    }

    #[test]
    fn default_entry_survives_eviction_pressure() {
        let mut cache = cache();
        let default = TzId::new("America/New_York");
        cache.store(&default, "20240301", "20240301T050000Z");

        // Overflow the two-entry cache with other ids.
        for id in ["Europe/Paris", "Asia/Tokyo", "Australia/Sydney"] {
            cache.store(&TzId::new(id), "20240301", "irrelevant");
        }

        assert!(cache.lookup(&default, "20240301").is_some());
    }

    #[test]
    fn moving_the_pin_keeps_the_old_entry() {
        let mut cache = cache();
        let old = TzId::new("America/New_York");
        let new = TzId::new("Asia/Kolkata");
        cache.store(&old, "20240301", "20240301T050000Z");

        cache.set_default(&new);
        assert_eq!(cache.default_id(), &new);
        assert!(cache.lookup(&old, "20240301").is_some());

        cache.set_default(&old);
        assert!(cache.lookup(&old, "20240301").is_some());
    }

    #[test]
    fn pin_attaches_when_default_entry_is_created_later() {
        let mut cache = cache();
        let default = TzId::new("America/New_York");

        cache.set_default(&default); // no entry yet
        cache.store(&default, "20240301", "20240301T050000Z");
        for id in ["Europe/Paris", "Asia/Tokyo", "Australia/Sydney"] {
            cache.store(&TzId::new(id), "20240301", "irrelevant");
        }
        assert!(cache.lookup(&default, "20240301").is_some());
    }
}
