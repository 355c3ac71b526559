use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling for any pool size setting.
pub const MAX_POOL_SIZE_LIMIT: usize = 200;

/// Longest keep-alive accepted for idle workers.
pub const MAX_KEEP_ALIVE_SECS: u64 = 24 * 60 * 60;

/// Worker pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Workers kept alive while idle (default: 0)
    #[serde(default = "default_core_size")]
    pub core_size: usize,

    /// Upper bound of concurrently running stage tasks (default: 20)
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Idle time in seconds before a worker above `core_size` exits (default: 60)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Grow `max_size` when a batch of escalated queries exceeds free capacity
    #[serde(default = "default_true")]
    pub auto_adjust: bool,

    /// Size of the pool that runs MX retries (default: 10)
    #[serde(default = "default_retry_max_size")]
    pub retry_max_size: usize,

    /// Grace period for draining queued work on shutdown, in seconds
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl PoolConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            core_size: default_core_size(),
            max_size: default_max_size(),
            keep_alive_secs: default_keep_alive_secs(),
            auto_adjust: default_true(),
            retry_max_size: default_retry_max_size(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

fn default_core_size() -> usize {
    0
}

fn default_max_size() -> usize {
    20
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_retry_max_size() -> usize {
    10
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}
