//! In-memory TTL cache.
//!
//! Entries are valid while `now - timestamp <= ttl`. Nothing sweeps the
//! cache; an expired entry is dropped the next time it is read.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::time::{SharedClock, SystemClock};

/// Default entry lifetime: five minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value with its insertion time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// Cached value.
    pub data: T,
    /// When the value was stored.
    pub timestamp: Instant,
    /// How long the value stays valid.
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    /// Returns true if the entry is still valid at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) <= self.ttl
    }
}

/// String-keyed cache with per-entry TTL.
pub struct TtlCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    default_ttl: Duration,
    clock: SharedClock,
}

impl<T> std::fmt::Debug for TtlCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.lock().len())
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> TtlCache<T> {
    /// Creates a cache on the system clock.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, std::sync::Arc::new(SystemClock))
    }

    /// Creates a cache on the given clock.
    #[must_use]
    pub fn with_clock(default_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    /// Stores a value with the default TTL.
    pub fn insert(&self, key: impl Into<String>, data: T) {
        self.insert_with_ttl(key, data, self.default_ttl);
    }

    /// Stores a value with an explicit TTL.
    pub fn insert_with_ttl(&self, key: impl Into<String>, data: T, ttl: Duration) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now(),
            ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Returns the value if present and still valid, evicting it otherwise.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        self.entry(key).map(|entry| entry.data)
    }

    /// Returns the whole entry if present and still valid, evicting it otherwise.
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => Some(entry.clone()),
            Some(_) => {
                entries.remove(key);
                debug!("Cache entry {key} expired");
                None
            }
            None => None,
        }
    }

    /// Removes one entry.
    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> TtlCache<T> {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
