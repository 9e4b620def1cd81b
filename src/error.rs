//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

/// Boxed error produced by codecs and fallback compute functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is not present (never set, or already pruned)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Value could not be encoded; the store was left unchanged
    #[error("Failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Stored payload could not be decoded into the requested type
    #[error("Failed to decode value for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Fallback compute function failed; nothing was stored
    #[error("Fallback for key {key} failed: {source}")]
    Compute {
        key: String,
        #[source]
        source: BoxError,
    },

    /// Operation attempted after `finish`
    #[error("Cache has been finished")]
    Finished,

    /// Every sender for a subscription is gone
    #[error("Subscription closed: {0}")]
    SubscriptionClosed(String),

    /// No update arrived within the caller's timeout
    #[error("Timed out waiting for update on key: {0}")]
    RecvTimeout(String),
}

impl CacheError {
    /// Returns true for [`CacheError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
