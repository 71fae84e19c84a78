//! Cache Store Module
//!
//! Main cache engine combining a concurrent map of entries with the
//! expiration index.

use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use tracing::debug;

use crate::cache::{current_timestamp, CacheCounters, CacheEntry, CacheKey, CacheStats, ExpirationIndex};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Shared cache storage with TTL support.
///
/// Lookups only touch the sharded entry map. Writes and sweeps go through
/// the expiration index lock so that every stored key has exactly one
/// expiration record.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key -> cached response
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
    /// Expiry ordering of stored keys
    expirations: Mutex<ExpirationIndex>,
    /// Performance counters
    counters: CacheCounters,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self) -> Result<MutexGuard<'_, ExpirationIndex>> {
        self.expirations
            .lock()
            .map_err(|_| CacheError::Internal("expiration index lock poisoned".to_string()))
    }

    // == Lookup ==
    /// Retrieves the entry for `key` if it is present and not expired.
    pub fn lookup(&self, key: &CacheKey) -> Result<Arc<CacheEntry>> {
        self.lookup_at(key, current_timestamp())
    }

    /// Same as [`lookup`](Self::lookup) with an explicit clock reading.
    ///
    /// Expired entries are left in place for the sweeper.
    pub fn lookup_at(&self, key: &CacheKey, now: i64) -> Result<Arc<CacheEntry>> {
        let entry = match self.entries.get(key) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                self.counters.record_missing();
                return Err(CacheError::NoSuchKey);
            }
        };

        if entry.key != *key {
            return Err(CacheError::Internal(format!(
                "entry stored under {} carries key {}",
                key, entry.key
            )));
        }

        if entry.is_expired_at(now) {
            self.counters.record_expired();
            return Err(CacheError::Expired);
        }

        self.counters.record_hit();
        Ok(entry)
    }

    // == Put ==
    /// Inserts or replaces the entry for `entry.key`.
    ///
    /// The expiration record is replaced in the same critical section.
    /// Racing puts for one key are last-write-wins.
    pub fn put(&self, entry: CacheEntry) -> Result<()> {
        let key = entry.key;
        let expires_at = entry.expires_at;
        let entry = Arc::new(entry);

        let mut index = self.index()?;
        index.insert(key, expires_at);
        self.entries.insert(key, entry);
        drop(index);

        self.counters.record_store();
        debug!(key = %key, expires_at, "cached");
        Ok(())
    }

    // == Delete ==
    /// Removes an entry and its expiration record.
    ///
    /// Returns whether an entry was present.
    pub fn delete(&self, key: &CacheKey) -> Result<bool> {
        let mut index = self.index()?;
        index.remove_by_key(key);
        Ok(self.entries.remove(key).is_some())
    }

    // == Sweep Expired ==
    /// Removes every entry whose expiry is at or before `now`.
    ///
    /// Returns the keys that were evicted.
    pub fn sweep_expired(&self, now: i64) -> Result<Vec<CacheKey>> {
        let mut index = self.index()?;
        let expired = index.sweep_expired(now);
        for key in &expired {
            self.entries.remove(key);
        }
        drop(index);

        self.counters.record_evictions(expired.len() as u64);
        Ok(expired)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }

    /// Returns the number of expiration records, for invariant checks.
    pub fn expiration_records(&self) -> Result<usize> {
        Ok(self.index()?.record_count())
    }

    // == Length ==
    /// Returns the current number of entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
