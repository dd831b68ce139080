//! Integration tests for the configuration system

use std::fs;
use std::path::PathBuf;
use sublink_config::{
    CacheConfig, Config, ConfigError, ConfigLoader, ConfigSection, LogLevel, NetworkConfig,
    ServerConfig, CONFIG_VERSION,
};
use tempfile::TempDir;

const FULL_CONFIG: &str = r#"
version = 1
log_level = "info"

[server]
primary_url = "http://192.168.1.10:4040"
secondary_url = "https://music.example.org"
username = "alice"
password = "enc:736563726574"
compatible_mode = true

[network]
request_timeout_secs = 20
probe_timeout_secs = 3
max_concurrent_requests = 4
max_retries = 2
initial_backoff_ms = 500
secondary_only_on_cellular = false
user_agent = "sublink-test"

[cache]
directory = "/tmp/sublink-artwork"
expiration_days = 14
clean_on_startup = false
"#;

fn write_config(contents: &str) -> Result<(TempDir, PathBuf), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("config.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn test_load_full_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, path) = write_config(FULL_CONFIG)?;

    let config = ConfigLoader::load(&path)?;

    assert_eq!(config.version, CONFIG_VERSION);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(
        config.server.primary_url.as_deref(),
        Some("http://192.168.1.10:4040")
    );
    assert_eq!(config.server.password, "enc:736563726574");
    assert!(config.server.compatible_mode);
    assert_eq!(config.network.max_concurrent_requests, 4);
    assert!(!config.network.secondary_only_on_cellular);
    assert_eq!(config.cache.expiration_days, 14);
    assert_eq!(
        config.cache.resolved_directory()?,
        PathBuf::from("/tmp/sublink-artwork")
    );

    Ok(())
}

#[test]
fn test_validation_errors_name_every_field() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, path) = write_config(
        r#"
        [server]
        primary_url = "192.168.1.10:4040"

        [network]
        probe_timeout_secs = 0

        [cache]
        expiration_days = 0
        "#,
    )?;

    match ConfigLoader::load(&path) {
        Err(ConfigError::ValidationError(message)) => {
            assert!(message.contains("server.primary_url"));
            assert!(message.contains("network.probe_timeout_secs"));
            assert!(message.contains("cache.expiration_days"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    Ok(())
}

#[test]
fn test_unknown_enum_value_is_parse_error() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, path) = write_config("log_level = \"verbose\"\n")?;
    assert!(matches!(
        ConfigLoader::load(&path),
        Err(ConfigError::ParseError { .. })
    ));
    Ok(())
}

#[test]
fn test_sections_default_independently() {
    assert!(ServerConfig::default().validate().is_ok());
    assert!(NetworkConfig::default().validate().is_ok());
    assert!(CacheConfig::default().validate().is_ok());
    assert_eq!(NetworkConfig::default().section_name(), "network");
}

#[test]
fn test_round_trip_through_toml() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_toml_str(FULL_CONFIG)?;
    let rendered = toml::to_string(&config)?;
    assert_eq!(Config::from_toml_str(&rendered)?, config);
    Ok(())
}
