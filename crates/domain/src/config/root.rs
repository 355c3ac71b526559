use super::cache::MAX_CACHE_TTL_SECS;
use super::pool::{MAX_KEEP_ALIVE_SECS, MAX_POOL_SIZE_LIMIT};
use super::resolver::{MAX_RESOLVER_TIMEOUT_MS, MIN_RESOLVER_TIMEOUT_MS};
use super::{
    CacheConfig, ConfigError, LoggingConfig, MxConfig, PoolConfig, RdnsConfig, ResolverConfig,
};
use crate::options::ResolutionOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ipscope.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub mx: MxConfig,

    #[serde(default)]
    pub rdns: RdnsConfig,

    /// Stages requested for newly submitted queries
    #[serde(default)]
    pub defaults: ResolutionOptions,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values given on the command line take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub max_pool_size: Option<usize>,
    pub resolver_timeout_ms: Option<u64>,
    pub round_robin: Option<bool>,
    pub upstream_servers: Vec<String>,
    pub pitfall_file: Option<String>,
}

impl Config {
    pub fn load(path: Option<&str>, overrides: CliOverrides) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => Some(PathBuf::from(p)),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                default.exists().then(|| default.to_path_buf())
            }
        };

        let mut config = match path {
            Some(path) => {
                let text =
                    std::fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(max) = overrides.max_pool_size {
            self.pool.max_size = max;
        }
        if let Some(timeout) = overrides.resolver_timeout_ms {
            self.resolver.timeout_ms = timeout;
        }
        if let Some(round_robin) = overrides.round_robin {
            self.resolver.round_robin = round_robin;
        }
        if !overrides.upstream_servers.is_empty() {
            self.resolver.upstream_servers = overrides.upstream_servers;
        }
        if overrides.pitfall_file.is_some() {
            self.mx.pitfall_file = overrides.pitfall_file;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pool = &self.pool;
        if pool.max_size == 0 || pool.max_size > MAX_POOL_SIZE_LIMIT {
            return Err(ConfigError::Validation(format!(
                "pool.max_size must be within 1..={MAX_POOL_SIZE_LIMIT}, got {}",
                pool.max_size
            )));
        }
        if pool.core_size > pool.max_size {
            return Err(ConfigError::Validation(format!(
                "pool.core_size ({}) cannot exceed pool.max_size ({})",
                pool.core_size, pool.max_size
            )));
        }
        if pool.keep_alive_secs > MAX_KEEP_ALIVE_SECS {
            return Err(ConfigError::Validation(format!(
                "pool.keep_alive_secs cannot exceed {MAX_KEEP_ALIVE_SECS}"
            )));
        }
        if pool.retry_max_size == 0 || pool.retry_max_size > MAX_POOL_SIZE_LIMIT {
            return Err(ConfigError::Validation(format!(
                "pool.retry_max_size must be within 1..={MAX_POOL_SIZE_LIMIT}"
            )));
        }

        if self.cache.ttl_secs == 0 || self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Validation(format!(
                "cache.ttl_secs must be within 1..={MAX_CACHE_TTL_SECS}, got {}",
                self.cache.ttl_secs
            )));
        }
        if self.cache.observer_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.observer_interval_secs must be positive".into(),
            ));
        }

        let timeouts = [
            ("resolver.timeout_ms", self.resolver.timeout_ms),
            ("resolver.recheck_timeout_ms", self.resolver.recheck_timeout_ms),
        ];
        for (name, value) in timeouts {
            if !(MIN_RESOLVER_TIMEOUT_MS..=MAX_RESOLVER_TIMEOUT_MS).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be within {MIN_RESOLVER_TIMEOUT_MS}..={MAX_RESOLVER_TIMEOUT_MS} ms, got {value}"
                )));
            }
        }
        if self.resolver.fallback_servers.is_empty() {
            return Err(ConfigError::Validation(
                "resolver.fallback_servers cannot be empty".into(),
            ));
        }

        if self.mx.connect_timeout_ms == 0 || self.mx.read_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "mx probe timeouts must be positive".into(),
            ));
        }
        if self.rdns.concurrency == 0 {
            return Err(ConfigError::Validation(
                "rdns.concurrency must be positive".into(),
            ));
        }

        Ok(())
    }
}
