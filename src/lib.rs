//! TTL Cache - an in-process key-value cache
//!
//! Stores arbitrary serializable values under string keys, expires them
//! with a background prune task and notifies per-key subscribers on writes.
//!
//! ```no_run
//! # async fn demo() -> ttl_cache::Result<()> {
//! use std::time::Duration;
//! use ttl_cache::{Cache, Config, Ttl};
//!
//! let cache = Cache::new(Config::default().with_entry_lifetime(Duration::from_secs(60)));
//! cache.set_with_ttl("build", &vec![1, 2, 3], Ttl::Never).await?;
//! let build: Vec<u32> = cache.get("build").await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, CacheStats, Codec, JsonCodec, Subscription};
pub use config::{Config, Ttl};
pub use error::{CacheError, Result};
