//! Configuration module for ipscope
//!
//! This module contains all configuration structures organized by concern:
//! - `root`: Main configuration, loading and CLI overrides
//! - `pool`: Worker pool sizing
//! - `cache`: Resolution cache TTLs and observer schedule
//! - `resolver`: Upstream DNS servers and timeouts
//! - `mx`: MX verification and pitfall sources
//! - `rdns`: Reverse lookup settings
//! - `logging`: Logging settings
//! - `errors`: Configuration errors

pub mod cache;
pub mod errors;
pub mod logging;
pub mod mx;
pub mod pool;
pub mod rdns;
pub mod resolver;
pub mod root;

pub use cache::CacheConfig;
pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use mx::MxConfig;
pub use pool::PoolConfig;
pub use rdns::RdnsConfig;
pub use resolver::ResolverConfig;
pub use root::{CliOverrides, Config};
