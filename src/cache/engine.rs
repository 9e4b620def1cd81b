//! Cache Engine Module
//!
//! The public cache handle: typed set/get over the encoded store, TTL
//! handling, fan-out to subscribers and the lifecycle of the prune task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::pubsub::Subscribers;
use crate::cache::{
    CacheEntry, CacheStats, CacheStore, Codec, JsonCodec, StatsCounters, Subscription,
};
use crate::config::{Config, Ttl};
use crate::error::{BoxError, CacheError, Result};
use crate::tasks::{prune_expired, spawn_prune_task, PruneSchedule, Shutdown};

// == Cache ==
/// An in-process key-value cache with TTL expiry.
///
/// `Cache` is a cheap handle: clones share the same entries, subscribers and
/// prune task. Values of any `Serialize` type are stored encoded with the
/// codec `C` and decoded on read into whatever type the caller asks for.
///
/// # Example
/// ```no_run
/// # async fn demo() -> ttl_cache::Result<()> {
/// use ttl_cache::{Cache, Config};
///
/// let cache = Cache::new(Config::default());
/// cache.set("greeting", "hello").await?;
/// let greeting: String = cache.get("greeting").await?;
/// assert_eq!(greeting, "hello");
/// cache.finish();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cache<C: Codec = JsonCodec> {
    inner: Arc<Inner<C>>,
}

#[derive(Debug)]
struct Inner<C> {
    config: Config,
    codec: Arc<C>,
    store: Arc<RwLock<CacheStore>>,
    subscribers: Subscribers,
    stats: Arc<StatsCounters>,
    shutdown: Arc<Shutdown>,
    prune_task: JoinHandle<()>,
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl<C: Codec> Clone for Cache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Cache<JsonCodec> {
    // == Constructor ==
    /// Creates a cache using the JSON codec and starts its prune task.
    ///
    /// Zero-valued config fields are replaced by the defaults.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new(config: Config) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> Cache<C> {
    /// Creates a cache with a custom codec and starts its prune task.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn with_codec(config: Config, codec: C) -> Self {
        let config = config.normalized();
        let store = Arc::new(RwLock::new(CacheStore::new()));
        let stats = Arc::new(StatsCounters::default());
        let shutdown = Arc::new(Shutdown::new());

        let prune_task = spawn_prune_task(
            Arc::downgrade(&store),
            Arc::clone(&stats),
            PruneSchedule::from(&config),
            Arc::clone(&shutdown),
        );

        info!(
            "Cache started: entry_lifetime={:?}, prune_interval={:?}, poll_interval={:?}",
            config.entry_lifetime, config.prune_interval, config.poll_interval
        );

        Self {
            inner: Arc::new(Inner {
                config,
                codec: Arc::new(codec),
                store,
                subscribers: Subscribers::default(),
                stats,
                shutdown,
                prune_task,
            }),
        }
    }

    /// The normalized configuration in effect.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // == Set ==
    /// Stores `value` under `key` with the configured entry lifetime.
    ///
    /// Replaces any previous entry in full, then publishes the value to the
    /// key's subscribers. Publishing waits until each subscriber in turn has
    /// received the value, so a subscriber that never reads stalls this call.
    pub async fn set<T>(&self, key: impl Into<String>, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_with_ttl(key, value, self.inner.config.entry_lifetime)
            .await
    }

    /// Like [`Cache::set`], with a TTL for this entry only.
    ///
    /// [`Ttl::Never`] keeps the entry until the cache is finished or dropped.
    pub async fn set_with_ttl<T>(
        &self,
        key: impl Into<String>,
        value: &T,
        ttl: Ttl,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.ensure_running()?;
        let key = key.into();

        let payload: Arc<[u8]> = match self.inner.codec.encode(value) {
            Ok(bytes) => bytes.into(),
            Err(source) => return Err(CacheError::Encode { key, source }),
        };

        {
            let mut store = self.inner.store.write().await;
            // `finish` may have released the entries while we waited for the lock
            self.ensure_running()?;
            store.insert(key.clone(), CacheEntry::new(Arc::clone(&payload), ttl));
        }

        self.inner.subscribers.publish(&key, &payload).await;
        Ok(())
    }

    // == Get ==
    /// Retrieves and decodes the value stored under `key`.
    ///
    /// Fails with [`CacheError::NotFound`] if the key is absent and with
    /// [`CacheError::Decode`] if the payload is not a `T`. Reading does not
    /// extend the entry's lifetime.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.ensure_running()?;

        let payload = self
            .inner
            .store
            .read()
            .await
            .get(key)
            .map(|entry| Arc::clone(&entry.payload));

        match payload {
            Some(payload) => {
                self.inner.stats.record_hit();
                self.inner
                    .codec
                    .decode(&payload)
                    .map_err(|source| CacheError::Decode {
                        key: key.to_string(),
                        source,
                    })
            }
            None => {
                self.inner.stats.record_miss();
                Err(CacheError::NotFound(key.to_string()))
            }
        }
    }

    // == Get Fallback ==
    /// Returns the value under `key`, computing and storing it on a miss.
    ///
    /// On a miss `compute` runs, its value is stored with the configured
    /// entry lifetime, published like [`Cache::set`] and returned. A failing
    /// `compute` stores nothing. Concurrent misses on the same key may each
    /// run `compute`; the last write wins.
    pub async fn get_fallback<T, F, Fut, E>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        self.get_fallback_with_ttl(key, self.inner.config.entry_lifetime, compute)
            .await
    }

    /// Like [`Cache::get_fallback`], storing a computed value with `ttl`.
    pub async fn get_fallback_with_ttl<T, F, Fut, E>(
        &self,
        key: &str,
        ttl: Ttl,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxError>,
    {
        match self.get(key).await {
            Err(CacheError::NotFound(_)) => {}
            found => return found,
        }

        debug!("Cache miss for {}, computing fallback", key);
        let value = compute().await.map_err(|e| CacheError::Compute {
            key: key.to_string(),
            source: e.into(),
        })?;

        self.set_with_ttl(key, &value, ttl).await?;
        Ok(value)
    }

    // == Subscribe ==
    /// Registers a subscriber for updates to `key`.
    ///
    /// Every later `set`-family call on the key delivers its value to the
    /// subscription. The subscription must be drained: a writer to the key
    /// waits until the subscription has received its update. Dropping the
    /// subscription stops delivery to it.
    pub async fn subscribe(&self, key: &str) -> Result<Subscription<C>> {
        self.ensure_running()?;
        let rx = self.inner.subscribers.register(key).await;
        Ok(Subscription::new(
            key.to_string(),
            rx,
            Arc::clone(&self.inner.codec),
        ))
    }

    // == Time To Live ==
    /// Returns how long the entry under `key` has left before it becomes
    /// eligible for pruning, or None for a never-expire entry.
    pub async fn ttl_remaining(&self, key: &str) -> Result<Option<Duration>> {
        self.ensure_running()?;
        self.inner
            .store
            .read()
            .await
            .get(key)
            .map(|entry| entry.ttl_remaining_at(Utc::now()))
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Prune Now ==
    /// Runs one prune scan immediately and returns the number of entries
    /// removed. Works even when background pruning is disabled.
    pub async fn prune_now(&self) -> Result<usize> {
        self.ensure_running()?;
        let removed = prune_expired(&self.inner.store, Utc::now()).await;
        self.inner.stats.record_pruned(removed);
        Ok(removed)
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub async fn len(&self) -> usize {
        self.inner.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.store.read().await.is_empty()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let total_entries = self.len().await;
        let subscribers = self.inner.subscribers.count().await;
        self.inner.stats.snapshot(total_entries, subscribers)
    }

    // == Finish ==
    /// Stops the prune task and releases every stored entry. The cache cannot
    /// be used afterwards: every operation returns [`CacheError::Finished`].
    /// Calling it again is a no-op.
    ///
    /// The prune task notices the signal within one poll interval. If an
    /// in-flight operation holds the store lock, the entries are released as
    /// soon as it lets go.
    pub fn finish(&self) {
        if !self.inner.shutdown.cancel() {
            return;
        }

        match self.inner.store.try_write() {
            Ok(mut store) => store.clear(),
            Err(_) => {
                let store = Arc::clone(&self.inner.store);
                match Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move { store.write().await.clear() });
                    }
                    // Outside a runtime, so blocking on the lock is allowed
                    Err(_) => store.blocking_write().clear(),
                }
            }
        }
        info!("Cache finished");
    }

    pub fn is_finished(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// True while the background prune task is still running.
    pub fn is_pruning(&self) -> bool {
        !self.inner.prune_task.is_finished()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_finished() {
            Err(CacheError::Finished)
        } else {
            Ok(())
        }
    }
}
