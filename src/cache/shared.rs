//! Shared Cache Module
//!
//! The process-wide cache instance behind a construct-once guard.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::cache::{Cache, JsonCodec};
use crate::config::Config;

static SHARED: Mutex<Option<Cache<JsonCodec>>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<Cache<JsonCodec>>> {
    // The slot only ever holds a fully built cache, so a poisoned lock is still consistent
    SHARED.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Cache<JsonCodec> {
    // == Shared Instance ==
    /// Returns the process-wide cache, creating it from `config` on the
    /// first call.
    ///
    /// Later calls return the existing instance and ignore `config`, even if
    /// the instance has been finished. Concurrent first calls construct
    /// exactly one cache and one prune task.
    ///
    /// # Panics
    /// Panics if the first call happens outside of a Tokio runtime.
    pub fn new_shared(config: Config) -> Self {
        let mut slot = slot();
        if let Some(cache) = slot.as_ref() {
            return cache.clone();
        }

        let cache = Cache::new(config);
        info!("Shared cache initialized");
        *slot = Some(cache.clone());
        cache
    }

    /// Returns the shared cache.
    ///
    /// # Panics
    /// Panics if [`Cache::new_shared`] has not been called yet.
    pub fn shared() -> Self {
        match Self::try_shared() {
            Some(cache) => cache,
            None => panic!(
                "shared cache not started, call Cache::new_shared(Config::default()) first"
            ),
        }
    }

    /// Returns the shared cache if it has been created.
    pub fn try_shared() -> Option<Self> {
        slot().clone()
    }

    /// Finishes and forgets the shared cache, so the next
    /// [`Cache::new_shared`] builds a fresh one. Returns the old instance.
    pub fn reset_shared() -> Option<Self> {
        let previous = slot().take();
        if let Some(cache) = previous.as_ref() {
            cache.finish();
        }
        previous
    }
}
