use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest TTL a resolved record may stay cached.
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Resolution cache and observer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Seconds since last access before a record with requested stages is evicted (default: 1800)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Seconds of inactivity before a record that never requested a stage is evicted (default: 3600)
    #[serde(default = "default_unresolved_ttl_secs")]
    pub unresolved_ttl_secs: u64,

    #[serde(default = "default_true")]
    pub observer_enabled: bool,

    /// Delay before the first sweep, in seconds (default: 600)
    #[serde(default = "default_observer_initial_delay_secs")]
    pub observer_initial_delay_secs: u64,

    /// Interval between sweeps, in seconds (default: 1200)
    #[serde(default = "default_observer_interval_secs")]
    pub observer_interval_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn unresolved_ttl(&self) -> Duration {
        Duration::from_secs(self.unresolved_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            unresolved_ttl_secs: default_unresolved_ttl_secs(),
            observer_enabled: default_true(),
            observer_initial_delay_secs: default_observer_initial_delay_secs(),
            observer_interval_secs: default_observer_interval_secs(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

fn default_unresolved_ttl_secs() -> u64 {
    60 * 60
}

fn default_true() -> bool {
    true
}

fn default_observer_initial_delay_secs() -> u64 {
    10 * 60
}

fn default_observer_interval_secs() -> u64 {
    20 * 60
}
