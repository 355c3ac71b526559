use ipscope_domain::{CliOverrides, Config, ConfigError, MxOption};
use std::io::Write;

#[test]
fn test_defaults_are_valid() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.pool.core_size, 0);
    assert_eq!(config.pool.max_size, 20);
    assert_eq!(config.pool.keep_alive_secs, 60);
    assert!(config.pool.auto_adjust);
    assert_eq!(config.pool.retry_max_size, 10);
    assert_eq!(config.cache.ttl_secs, 1800);
    assert_eq!(config.cache.unresolved_ttl_secs, 3600);
    assert_eq!(config.resolver.timeout_ms, 3000);
    assert_eq!(config.resolver.recheck_timeout_ms, 20000);
    assert_eq!(config.resolver.recheck_retries, 1);
    assert_eq!(config.mx.smtp_port, 25);
}

#[test]
fn test_load_from_file_with_partial_sections() {
    // Arrange
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[pool]
max_size = 40

[resolver]
upstream_servers = ["192.0.2.53:53"]
round_robin = true

[defaults]
resolve_mx = true
mx_options = ["RETRY", "VERIFY_IPS"]
resolve_txt = true
"#
    )
    .unwrap();

    // Act
    let config = Config::load(file.path().to_str(), CliOverrides::default()).unwrap();

    // Assert
    assert_eq!(config.pool.max_size, 40);
    assert_eq!(config.pool.core_size, 0);
    assert!(config.resolver.round_robin);
    assert_eq!(config.resolver.upstream_servers, vec!["192.0.2.53:53"]);
    assert!(config.defaults.resolve_mx);
    assert!(config.defaults.mx_options.contains(MxOption::VerifyIps));
    assert!(!config.defaults.resolve_rdns);
    assert!(config.validate().is_ok());
}

#[test]
fn test_cli_overrides_take_precedence() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[logging]\nlevel = \"warn\"\n[pool]\nmax_size = 40").unwrap();

    let overrides = CliOverrides {
        log_level: Some("debug".into()),
        max_pool_size: Some(5),
        ..Default::default()
    };
    let config = Config::load(file.path().to_str(), overrides).unwrap();

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.pool.max_size, 5);
}

#[test]
fn test_missing_file_is_reported() {
    let result = Config::load(Some("/nonexistent/ipscope.toml"), CliOverrides::default());
    assert!(matches!(result, Err(ConfigError::FileRead { .. })));
}

#[test]
fn test_invalid_toml_is_reported() {
    let result = Config::from_toml("[pool\nmax_size = ");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_validation_rejects_out_of_range_values() {
    let mut config = Config::default();
    config.pool.max_size = 201;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.pool.core_size = 30;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.cache.ttl_secs = 24 * 60 * 60 + 1;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.resolver.timeout_ms = 500;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.pool.keep_alive_secs = 24 * 60 * 60 + 1;
    assert!(config.validate().is_err());
}
