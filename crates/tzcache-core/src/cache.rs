//! Bounded, TTL-expiring key-value cache with pin support.
//!
//! [`EvictionCache`] backs both the definition cache and the per-id
//! date caches. Entries expire after a TTL and the cache holds at most
//! `capacity` entries, evicting the oldest unpinned entry on overflow.
//! A pinned entry is exempt from both TTL expiry and capacity eviction
//! until it is unpinned; the service pins the date cache of the active
//! default timezone id.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// A single cache entry.
#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// When the entry was inserted (eviction order).
    inserted_at: Instant,
    /// When the entry expires (monotonic clock).
    expires_at: Instant,
    /// Pinned entries ignore TTL and capacity eviction.
    pinned: bool,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        !self.pinned && Instant::now() >= self.expires_at
    }
}

/// Bounded, time-expiring key-value store.
#[derive(Debug)]
pub struct EvictionCache<V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
}

impl<V> EvictionCache<V> {
    /// Creates a cache holding at most `capacity` entries, each living
    /// for `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Gets a value by key, if present and not expired.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    /// Gets a mutable value by key, if present and not expired.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .get_mut(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &mut entry.value)
    }

    /// Returns true if `key` is present and not expired.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or replaces a value, resetting its TTL.
    ///
    /// Replacing an existing entry keeps its pin flag. Inserting a new
    /// entry into a full cache first drops expired entries, then the
    /// oldest unpinned entry. When every resident entry is pinned the
    /// insert still proceeds; the capacity bound is enforced only
    /// against unpinned entries.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.inserted_at = now;
            entry.expires_at = now + self.ttl;
            trace!(key = %key, "replaced cache entry");
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_expired();
        }
        if self.entries.len() >= self.capacity {
            self.evict_oldest_unpinned();
        }

        self.entries.insert(
            key.clone(),
            Entry {
                value,
                inserted_at: now,
                expires_at: now + self.ttl,
                pinned: false,
            },
        );
        trace!(key = %key, "inserted cache entry");
    }

    /// Pins an existing entry, exempting it from eviction and expiry.
    ///
    /// Returns true if the key was present.
    pub fn pin(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.pinned = true;
                debug!(key = %key, "pinned cache entry");
                true
            }
            None => false,
        }
    }

    /// Unpins an entry, returning it to normal eviction. The TTL clock
    /// restarts so a long-pinned entry does not expire immediately.
    ///
    /// Returns true if the key was present.
    pub fn unpin(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.pinned = false;
                entry.expires_at = Instant::now() + self.ttl;
                debug!(key = %key, "unpinned cache entry");
                true
            }
            None => false,
        }
    }

    /// Returns true if the entry exists and is pinned.
    pub fn is_pinned(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.pinned)
    }

    /// Removes an entry, pinned or not.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let removed = self.entries.remove(key).map(|entry| entry.value);
        if removed.is_some() {
            debug!(key = %key, "removed cache entry");
        }
        removed
    }

    /// Clears all entries, including pinned ones.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count = count, "cleared cache");
    }

    /// Removes all expired unpinned entries, returning how many were dropped.
    pub fn evict_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let keep = !entry.is_expired();
            if !keep {
                trace!(key = %key, "evicting expired cache entry");
            }
            keep
        });
        before - self.entries.len()
    }

    fn evict_oldest_unpinned(&mut self) {
        let victim = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.pinned)
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            debug!(key = %key, "evicted oldest cache entry");
        }
    }

    /// Returns the number of resident entries (expired ones included
    /// until the next eviction pass).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }
}
