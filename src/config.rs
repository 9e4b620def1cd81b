//! Configuration Module
//!
//! Tunable parameters for a cache instance and the defaults they fall back to.

use std::env;
use std::time::Duration;

/// Lifetime given to entries stored without an explicit TTL (24 hours).
pub const DEFAULT_ENTRY_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);
/// Minimum time between two full prune scans (5 minutes).
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);
/// Rest period of the prune loop between wake-ups (100 ms).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// == Ttl ==
/// Time-to-live of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// The entry is never evicted by age.
    Never,
    /// The entry becomes eligible for pruning once it is older than this.
    After(Duration),
}

impl Ttl {
    /// Returns true for the zero duration, which configs treat as "unset".
    pub fn is_zero(&self) -> bool {
        matches!(self, Ttl::After(d) if d.is_zero())
    }

    /// Returns the duration, or None for [`Ttl::Never`].
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Ttl::Never => None,
            Ttl::After(d) => Some(*d),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(d: Duration) -> Self {
        Ttl::After(d)
    }
}

// == Config ==
/// Cache configuration parameters.
///
/// Zero-valued fields are replaced by the package defaults when a cache is
/// constructed (see [`Config::normalize`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TTL for entries stored through `set` / `get_fallback`
    pub entry_lifetime: Ttl,
    /// Minimum time between full prune scans; `None` disables pruning entirely
    pub prune_interval: Option<Duration>,
    /// How long the prune loop rests between wake-ups
    pub poll_interval: Duration,
}

/// Returns the canonical default configuration (24h / 5min / 100ms).
pub fn default_config() -> Config {
    Config {
        entry_lifetime: Ttl::After(DEFAULT_ENTRY_LIFETIME),
        prune_interval: Some(DEFAULT_PRUNE_INTERVAL),
        poll_interval: DEFAULT_POLL_INTERVAL,
    }
}

impl Default for Config {
    fn default() -> Self {
        default_config()
    }
}

impl Config {
    /// An all-zero configuration; normalizes to the defaults.
    pub fn zeroed() -> Self {
        Self {
            entry_lifetime: Ttl::After(Duration::ZERO),
            prune_interval: Some(Duration::ZERO),
            poll_interval: Duration::ZERO,
        }
    }

    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ENTRY_LIFETIME_MS` - Default entry TTL in ms, or `never` (default: 24h)
    /// - `CACHE_PRUNE_INTERVAL_MS` - Prune scan interval in ms, or `off` (default: 5min)
    /// - `CACHE_POLL_INTERVAL_MS` - Prune loop poll interval in ms (default: 100ms)
    ///
    /// Missing or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = default_config();

        let entry_lifetime = match env::var("CACHE_ENTRY_LIFETIME_MS").ok().as_deref() {
            Some("never") => Ttl::Never,
            Some(v) => v
                .parse()
                .map(|ms| Ttl::After(Duration::from_millis(ms)))
                .unwrap_or(defaults.entry_lifetime),
            None => defaults.entry_lifetime,
        };

        let prune_interval = match env::var("CACHE_PRUNE_INTERVAL_MS").ok().as_deref() {
            Some("off") => None,
            Some(v) => v
                .parse()
                .map(|ms| Some(Duration::from_millis(ms)))
                .unwrap_or(defaults.prune_interval),
            None => defaults.prune_interval,
        };

        let poll_interval = env::var("CACHE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        let mut config = Self {
            entry_lifetime,
            prune_interval,
            poll_interval,
        };
        config.normalize();
        config
    }

    /// Sets the TTL used for entries stored without an explicit one.
    pub fn with_entry_lifetime(mut self, ttl: impl Into<Ttl>) -> Self {
        self.entry_lifetime = ttl.into();
        self
    }

    pub fn with_prune_interval(mut self, interval: Duration) -> Self {
        self.prune_interval = Some(interval);
        self
    }

    /// Disables the prune loop; entries then live as long as the cache.
    pub fn without_pruning(mut self) -> Self {
        self.prune_interval = None;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    // == Normalize ==
    /// Replaces every zero-valued field with its default. Idempotent.
    ///
    /// A disabled prune interval (`None`) is left as is.
    pub fn normalize(&mut self) {
        if self.entry_lifetime.is_zero() {
            self.entry_lifetime = Ttl::After(DEFAULT_ENTRY_LIFETIME);
        }
        if self.prune_interval.is_some_and(|d| d.is_zero()) {
            self.prune_interval = Some(DEFAULT_PRUNE_INTERVAL);
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
    }

    /// Returns a normalized copy.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}
