use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MX verification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MxConfig {
    /// Inline pitfall domains
    #[serde(default)]
    pub pitfalls: Vec<String>,

    /// Optional file with more pitfall domains (TOML `pitfalls = [...]` or one domain per line)
    #[serde(default)]
    pub pitfall_file: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// TCP connect timeout of a reachability probe in milliseconds (default: 2000)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Bound on resolving and answering during a probe in milliseconds (default: 3000)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl MxConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for MxConfig {
    fn default() -> Self {
        Self {
            pitfalls: Vec::new(),
            pitfall_file: None,
            smtp_port: default_smtp_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

fn default_smtp_port() -> u16 {
    25
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_read_timeout_ms() -> u64 {
    3_000
}
