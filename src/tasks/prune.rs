//! TTL Prune Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{CacheStore, StatsCounters};
use crate::config::Config;
use crate::tasks::Shutdown;

/// Timing of the prune loop, taken from a normalized [`Config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PruneSchedule {
    /// `None` disables pruning
    pub prune_interval: Option<Duration>,
    pub poll_interval: Duration,
}

impl From<&Config> for PruneSchedule {
    fn from(config: &Config) -> Self {
        Self {
            prune_interval: config.prune_interval,
            poll_interval: config.poll_interval,
        }
    }
}

/// Removes every entry expired at `now` and returns how many were removed.
///
/// Expired keys are collected under the read lock, then deleted under a
/// single write lock.
pub(crate) async fn prune_expired(store: &RwLock<CacheStore>, now: DateTime<Utc>) -> usize {
    let expired = store.read().await.expired_keys(now);
    if expired.is_empty() {
        return 0;
    }
    store.write().await.remove_expired(&expired, now)
}

/// Spawns the prune loop for one cache instance.
///
/// Every `poll_interval` the task wakes up, checks for shutdown, and runs a
/// full scan once at least `prune_interval` has passed since the previous
/// one. It exits when `shutdown` fires or the store has been dropped.
/// With pruning disabled the task returns immediately.
pub(crate) fn spawn_prune_task(
    store: Weak<RwLock<CacheStore>>,
    stats: Arc<StatsCounters>,
    schedule: PruneSchedule,
    shutdown: Arc<Shutdown>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(prune_interval) = schedule.prune_interval else {
            debug!("Pruning disabled, prune task exiting");
            return;
        };

        info!(
            "Starting prune task: prune_interval={:?}, poll_interval={:?}",
            prune_interval, schedule.poll_interval
        );

        let mut last_prune = Instant::now();
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            if last_prune.elapsed() >= prune_interval {
                last_prune = Instant::now();

                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = prune_expired(&store, Utc::now()).await;
                stats.record_pruned(removed);

                if removed > 0 {
                    info!("TTL prune: removed {} expired entries", removed);
                } else {
                    debug!("TTL prune: no expired entries found");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(schedule.poll_interval) => {}
                _ = shutdown.cancelled() => {}
            }
        }

        debug!("Prune task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheEntry;
    use crate::config::Ttl;
    use chrono::TimeDelta;

    fn schedule(prune_ms: Option<u64>) -> PruneSchedule {
        PruneSchedule {
            prune_interval: prune_ms.map(Duration::from_millis),
            poll_interval: Duration::from_millis(1),
        }
    }

    fn insert(store: &mut CacheStore, key: &str, ttl: Ttl, age: TimeDelta) {
        let entry = CacheEntry::created_at(Arc::from(b"1".as_slice()), ttl, Utc::now() - age);
        store.insert(key.to_string(), entry);
    }

    #[tokio::test]
    async fn test_prune_expired_two_phase() {
        let store = RwLock::new(CacheStore::new());
        {
            let mut guard = store.write().await;
            insert(&mut guard, "old", Ttl::After(Duration::from_secs(1)), TimeDelta::seconds(5));
            insert(&mut guard, "new", Ttl::After(Duration::from_secs(60)), TimeDelta::zero());
            insert(&mut guard, "pinned", Ttl::Never, TimeDelta::days(365));
        }

        assert_eq!(prune_expired(&store, Utc::now()).await, 1);
        let guard = store.read().await;
        assert!(guard.get("old").is_none());
        assert!(guard.get("new").is_some());
        assert!(guard.get("pinned").is_some());
    }

    #[tokio::test]
    async fn test_prune_task_removes_expired_entries() {
        let store = Arc::new(RwLock::new(CacheStore::new()));
        let stats = Arc::new(StatsCounters::default());
        let shutdown = Arc::new(Shutdown::new());
        insert(
            &mut *store.write().await,
            "expire_soon",
            Ttl::After(Duration::from_millis(1)),
            TimeDelta::zero(),
        );

        let handle = spawn_prune_task(
            Arc::downgrade(&store),
            stats.clone(),
            schedule(Some(5)),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.read().await.is_empty(), "Expired entry should have been pruned");
        assert_eq!(stats.snapshot(0, 0).pruned, 1);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should stop after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_prune_task_disabled_exits_immediately() {
        let store = Arc::new(RwLock::new(CacheStore::new()));
        insert(
            &mut *store.write().await,
            "immortal",
            Ttl::After(Duration::from_millis(1)),
            TimeDelta::seconds(10),
        );

        let handle = spawn_prune_task(
            Arc::downgrade(&store),
            Arc::new(StatsCounters::default()),
            schedule(None),
            Arc::new(Shutdown::new()),
        );

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("disabled task should exit")
            .unwrap();
        assert_eq!(store.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_prune_task_stops_when_store_dropped() {
        let store = Arc::new(RwLock::new(CacheStore::new()));
        let handle = spawn_prune_task(
            Arc::downgrade(&store),
            Arc::new(StatsCounters::default()),
            schedule(Some(1)),
            Arc::new(Shutdown::new()),
        );

        drop(store);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should notice the store is gone")
            .unwrap();
    }
}
