//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::Ttl;

// == Cache Entry ==
/// A single stored value: its encoded payload plus expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Encoded value
    pub payload: Arc<[u8]>,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Maximum age before the entry becomes eligible for pruning
    pub ttl: Ttl,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(payload: Arc<[u8]>, ttl: Ttl) -> Self {
        Self::created_at(payload, ttl, Utc::now())
    }

    /// Creates an entry with an explicit creation time.
    pub fn created_at(payload: Arc<[u8]>, ttl: Ttl, created_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            created_at,
            ttl,
        }
    }

    /// Age of the entry at `now`; zero if the clock moved backwards.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    // == Is Expired ==
    /// Checks whether the entry is older than its TTL at `now`.
    ///
    /// The comparison is strict: an entry whose age equals its TTL is still
    /// live. Never-expire entries are never expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Ttl::Never => false,
            Ttl::After(ttl) => match TimeDelta::from_std(ttl) {
                Ok(ttl) => now.signed_duration_since(self.created_at) > ttl,
                // Out of chrono's range, far beyond any realistic age
                Err(_) => false,
            },
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    // == Time To Live ==
    /// Returns the time left before the entry becomes eligible for pruning,
    /// or None for never-expire entries.
    pub fn ttl_remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.ttl
            .as_duration()
            .map(|ttl| ttl.saturating_sub(self.age_at(now)))
    }
}
