//! Integration Tests for the Shared Cache Instance
//!
//! Kept in their own test binary: the shared cache is process-wide state,
//! so everything touching it runs in a single sequential test.

use std::time::Duration;

use ttl_cache::{Cache, Config, Ttl};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_cache_lifecycle() {
    assert!(Cache::try_shared().is_none());
    let panicked = std::panic::catch_unwind(Cache::shared);
    assert!(panicked.is_err(), "shared() before new_shared() must panic");

    // Concurrent first calls construct a single instance
    let mut handles = Vec::new();
    for i in 0..8 {
        handles.push(tokio::spawn(async move {
            let config = Config::default().with_entry_lifetime(Duration::from_secs(i + 1));
            let cache = Cache::new_shared(config);
            cache.set(format!("from-{}", i), &i).await.unwrap();
            cache.config().clone()
        }));
    }
    let mut configs = Vec::new();
    for handle in handles {
        configs.push(handle.await.unwrap());
    }
    assert!(configs.windows(2).all(|w| w[0] == w[1]), "all callers see one config");

    let shared = Cache::shared();
    assert_eq!(shared.len().await, 8);

    // Later calls ignore their config
    let again = Cache::new_shared(Config::default().with_entry_lifetime(Ttl::Never));
    assert_eq!(again.config(), &configs[0]);
    again.set("written-via-again", "x").await.unwrap();
    assert_eq!(shared.get::<String>("written-via-again").await.unwrap(), "x");

    // Reset finishes the old instance and allows a fresh one
    let old = Cache::reset_shared().expect("shared cache was set");
    assert!(old.is_finished());
    assert_eq!(old.len().await, 0, "finishing releases the old entries");
    assert!(Cache::try_shared().is_none());

    let fresh = Cache::new_shared(Config::zeroed());
    assert!(!fresh.is_finished());
    assert!(fresh.is_empty().await);
    assert_eq!(fresh.config(), &Config::default());

    Cache::reset_shared();
}
