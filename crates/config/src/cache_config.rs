//! Artwork cache settings

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{ConfigSection, ValidationError, Validator};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Artwork cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory. Defaults to the platform cache directory.
    pub directory: Option<PathBuf>,

    /// Entries older than this are removed by a cleanup sweep
    pub expiration_days: u32,

    /// Run a cleanup sweep when the client starts
    pub clean_on_startup: bool,
}

impl CacheConfig {
    /// The configured directory, or `<platform cache dir>/artwork`
    ///
    /// - Linux: `~/.cache/sublink/artwork`
    /// - macOS: `~/Library/Caches/sublink/artwork`
    /// - Windows: `%LOCALAPPDATA%\sublink\cache\artwork`
    pub fn resolved_directory(&self) -> ConfigResult<PathBuf> {
        if let Some(directory) = &self.directory {
            return Ok(directory.clone());
        }

        ProjectDirs::from("", "", "sublink")
            .map(|dirs| dirs.cache_dir().join("artwork"))
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user cache directory".to_string(),
            })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            expiration_days: 7,
            clean_on_startup: true,
        }
    }
}

impl ConfigSection for CacheConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![Validator::in_range(
            self.expiration_days,
            1,
            365,
            "cache.expiration_days",
        )];

        if let Some(directory) = &self.directory {
            if directory.as_os_str().is_empty() {
                results.push(Err(ValidationError::new("cache.directory", "must not be empty")));
            }
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        if other.directory.is_some() {
            self.directory = other.directory;
        }
        self.expiration_days = other.expiration_days;
        self.clean_on_startup = other.clean_on_startup;
    }

    fn section_name(&self) -> &'static str {
        "cache"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.expiration_days, 7);
        assert!(config.clean_on_startup);
    }

    #[test]
    fn test_explicit_directory_wins() {
        let config = CacheConfig {
            directory: Some(PathBuf::from("/var/cache/sublink")),
            ..CacheConfig::default()
        };
        assert_eq!(
            config.resolved_directory().ok(),
            Some(PathBuf::from("/var/cache/sublink"))
        );
    }

    #[test]
    fn test_invalid_values() {
        let config = CacheConfig {
            directory: Some(PathBuf::new()),
            expiration_days: 0,
            clean_on_startup: false,
        };
        assert_eq!(config.validate().map_err(|e| e.len()), Err(2));
    }
}
