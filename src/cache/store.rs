//! Cache Store Module
//!
//! The key-to-entry map guarded by the cache's reader/writer lock.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;

// == Cache Store ==
/// Plain map storage. Locking is the caller's concern.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Insert ==
    /// Stores an entry, replacing any previous entry for the key in full.
    ///
    /// Returns the replaced entry, if any.
    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(key, entry)
    }

    // == Get ==
    /// Looks up an entry without touching its TTL.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Expired Keys ==
    /// Collects the keys of every entry expired at `now`.
    ///
    /// First phase of a prune scan; runs under the read lock.
    pub fn expired_keys(&self, now: DateTime<Utc>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Remove Expired ==
    /// Removes the given keys if they are still expired at `now`.
    ///
    /// Second phase of a prune scan; runs under the write lock. The expiry
    /// check is repeated because a key may have been overwritten between the
    /// two phases. Returns the number of entries removed.
    pub fn remove_expired(&mut self, keys: &[String], now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for key in keys {
            if self.entries.get(key).is_some_and(|e| e.is_expired_at(now)) {
                self.entries.remove(key);
                removed += 1;
            }
        }
        removed
    }

    // == Clear ==
    /// Drops every entry and releases the map's memory.
    pub fn clear(&mut self) {
        self.entries = HashMap::new();
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
