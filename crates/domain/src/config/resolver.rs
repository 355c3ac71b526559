use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_RESOLVER_TIMEOUT_MS: u64 = 1_000;
pub const MAX_RESOLVER_TIMEOUT_MS: u64 = 120_000;

/// Upstream DNS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Upstream servers ("host:port" or "ip"). Empty means read the system resolver list.
    #[serde(default)]
    pub upstream_servers: Vec<String>,

    /// Per-attempt timeout of the primary profile in milliseconds (default: 3000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra attempts of the primary profile (default: 0)
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-attempt timeout of the recheck profile used for retries (default: 20000)
    #[serde(default = "default_recheck_timeout_ms")]
    pub recheck_timeout_ms: u64,

    /// Extra attempts of the recheck profile (default: 1)
    #[serde(default = "default_recheck_retries")]
    pub recheck_retries: u32,

    /// Rotate the starting server per query instead of always trying in order
    #[serde(default)]
    pub round_robin: bool,

    /// Public resolvers used once no configured server is reachable
    #[serde(default = "default_fallback_servers")]
    pub fallback_servers: Vec<String>,

    /// Append the fallback resolvers to the regular rotation
    #[serde(default)]
    pub add_fallback_to_rotation: bool,

    /// Retry over TCP when a UDP answer is truncated (default: true)
    #[serde(default = "default_true")]
    pub tcp_on_truncation: bool,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn recheck_timeout(&self) -> Duration {
        Duration::from_millis(self.recheck_timeout_ms)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            upstream_servers: Vec::new(),
            timeout_ms: default_timeout_ms(),
            retries: default_retries(),
            recheck_timeout_ms: default_recheck_timeout_ms(),
            recheck_retries: default_recheck_retries(),
            round_robin: false,
            fallback_servers: default_fallback_servers(),
            add_fallback_to_rotation: false,
            tcp_on_truncation: default_true(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_retries() -> u32 {
    0
}

fn default_recheck_timeout_ms() -> u64 {
    20_000
}

fn default_recheck_retries() -> u32 {
    1
}

fn default_fallback_servers() -> Vec<String> {
    vec!["8.8.8.8:53".to_string(), "8.8.4.4:53".to_string()]
}

fn default_true() -> bool {
    true
}
