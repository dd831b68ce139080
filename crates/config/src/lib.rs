//! Sublink configuration
//!
//! Settings the client reads at startup: where the server is, how requests
//! behave and where artwork is cached. Sections implement [`ConfigSection`]
//! so each validates itself.
//!
//! # Example
//!
//! ```rust
//! use sublink_config::Config;
//!
//! let config = Config::from_toml_str(
//!     r#"
//!     [server]
//!     primary_url = "http://192.168.1.10:4040"
//!     username = "alice"
//!     "#,
//! )
//! .expect("valid config");
//!
//! assert_eq!(config.network.max_concurrent_requests, 3);
//! ```

mod cache_config;
mod error;
mod loader;
mod network_config;
mod server_config;
mod validation;

pub use cache_config::CacheConfig;
pub use error::{ConfigError, ConfigResult, ValidationError};
pub use loader::ConfigLoader;
pub use network_config::NetworkConfig;
pub use server_config::ServerConfig;
pub use validation::{ConfigSection, Validator};

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding `server.primary_url`
pub const ENV_PRIMARY_URL: &str = "SUBLINK_PRIMARY_URL";
/// Environment variable overriding `server.secondary_url`
pub const ENV_SECONDARY_URL: &str = "SUBLINK_SECONDARY_URL";
/// Environment variable overriding `server.username`
pub const ENV_USERNAME: &str = "SUBLINK_USERNAME";
/// Environment variable overriding `server.password`
pub const ENV_PASSWORD: &str = "SUBLINK_PASSWORD";

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    pub server: ServerConfig,

    pub network: NetworkConfig,

    pub cache: CacheConfig,

    pub log_level: LogLevel,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates TOML text
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(contents)?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.server.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.network.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.cache.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// [`validate`](Self::validate) folded into a single [`ConfigError`]
    pub fn ensure_valid(&self) -> ConfigResult<()> {
        self.validate().map_err(|errors| {
            let message = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            ConfigError::ValidationError(message)
        })
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.server.merge(other.server);
        self.network.merge(other.network);
        self.cache.merge(other.cache);
        self.log_level = other.log_level;
    }

    /// Applies `SUBLINK_*` server overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies server overrides looked up by environment variable name.
    /// Unset and empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = value(ENV_PRIMARY_URL) {
            log::debug!("{} overrides server.primary_url", ENV_PRIMARY_URL);
            self.server.primary_url = Some(url);
        }
        if let Some(url) = value(ENV_SECONDARY_URL) {
            log::debug!("{} overrides server.secondary_url", ENV_SECONDARY_URL);
            self.server.secondary_url = Some(url);
        }
        if let Some(username) = value(ENV_USERNAME) {
            self.server.username = username;
        }
        if let Some(password) = value(ENV_PASSWORD) {
            self.server.password = password;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: ServerConfig::default(),
            network: NetworkConfig::default(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
