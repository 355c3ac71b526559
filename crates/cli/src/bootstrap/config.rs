use ipscope_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;
    Ok(config)
}

/// Called once logging is up, which itself depends on the configuration.
pub fn log_config_summary(config_path: Option<&str>, config: &Config) {
    info!(
        config_file = config_path.unwrap_or("default"),
        max_pool_size = config.pool.max_size,
        retry_pool_size = config.pool.retry_max_size,
        upstream_servers = config.resolver.upstream_servers.len(),
        round_robin = config.resolver.round_robin,
        "Configuration loaded"
    );
}
