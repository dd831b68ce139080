//! Reading the configuration file

use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Loads configuration from disk
pub struct ConfigLoader;

impl ConfigLoader {
    /// Returns the default config file path based on the platform
    ///
    /// - Linux: `~/.config/sublink/config.toml`
    /// - macOS: `~/Library/Application Support/sublink/config.toml`
    /// - Windows: `%APPDATA%\sublink\config\config.toml`
    pub fn default_path() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "sublink")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    /// Loads and validates the configuration at `path`
    ///
    /// A missing file yields the defaults. An empty, unparseable or invalid
    /// file is an error.
    pub fn load(path: &Path) -> ConfigResult<Config> {
        if !path.exists() {
            log::info!("Config file not found at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        if contents.trim().is_empty() {
            return Err(ConfigError::EmptyFile {
                path: path.to_path_buf(),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.ensure_valid()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}
