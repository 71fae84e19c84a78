//! Expiration Index Module
//!
//! Orders cached keys by expiry time so the sweeper can find everything
//! that has expired without scanning the whole store.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::CacheKey;

// == Expiration Index ==
/// Tracks one expiry time per cached key.
///
/// Keys are bucketed by expiry second, so any number of keys may share
/// the same expiry. A reverse map gives each key's current bucket for
/// removal on overwrite.
#[derive(Debug, Default)]
pub struct ExpirationIndex {
    /// Expiry second -> keys expiring then
    buckets: BTreeMap<i64, HashSet<CacheKey>>,
    /// Key -> its current expiry second
    by_key: HashMap<CacheKey, i64>,
}

impl ExpirationIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Records `key` as expiring at `expires_at`.
    ///
    /// A previous record for the same key is replaced, never duplicated.
    pub fn insert(&mut self, key: CacheKey, expires_at: i64) {
        self.remove_by_key(&key);
        self.buckets.entry(expires_at).or_default().insert(key);
        self.by_key.insert(key, expires_at);
    }

    // == Remove By Key ==
    /// Removes the record for `key`, leaving other keys in its bucket alone.
    ///
    /// Returns the expiry time that was recorded, if any.
    pub fn remove_by_key(&mut self, key: &CacheKey) -> Option<i64> {
        let expires_at = self.by_key.remove(key)?;
        if let Some(bucket) = self.buckets.get_mut(&expires_at) {
            bucket.remove(key);
            if bucket.is_empty() {
                self.buckets.remove(&expires_at);
            }
        }
        Some(expires_at)
    }

    // == Sweep Expired ==
    /// Removes and returns every key whose expiry is at or before `now`.
    pub fn sweep_expired(&mut self, now: i64) -> Vec<CacheKey> {
        let live = self.buckets.split_off(&now.saturating_add(1));
        let expired = std::mem::replace(&mut self.buckets, live);

        let keys: Vec<CacheKey> = expired.into_values().flatten().collect();
        for key in &keys {
            self.by_key.remove(key);
        }
        keys
    }

    /// Returns the recorded expiry time for `key`.
    pub fn expires_at(&self, key: &CacheKey) -> Option<i64> {
        self.by_key.get(key).copied()
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Number of records across all buckets. Equal to `len()` unless a
    /// record leaked.
    pub fn record_count(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }
}
