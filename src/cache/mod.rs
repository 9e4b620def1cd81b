//! Cache Module
//!
//! In-memory key-value storage with TTL expiry, background pruning and
//! per-key subscriptions.

mod codec;
mod engine;
mod entry;
mod pubsub;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use codec::{Codec, JsonCodec};
pub use engine::Cache;
pub use entry::CacheEntry;
pub use pubsub::Subscription;
pub use stats::CacheStats;
pub use store::CacheStore;

pub(crate) use stats::StatsCounters;
