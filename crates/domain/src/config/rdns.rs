use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reverse lookup configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RdnsConfig {
    /// Reverse lookups in flight per record (default: 16)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Bound on one operating system reverse lookup in milliseconds (default: 5000)
    #[serde(default = "default_os_lookup_timeout_ms")]
    pub os_lookup_timeout_ms: u64,
}

impl RdnsConfig {
    pub fn os_lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.os_lookup_timeout_ms)
    }
}

impl Default for RdnsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            os_lookup_timeout_ms: default_os_lookup_timeout_ms(),
        }
    }
}

fn default_concurrency() -> usize {
    16
}

fn default_os_lookup_timeout_ms() -> u64 {
    5_000
}
