//! Error types for the configuration system

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file exists but is empty
    #[error("Config file at {path} is empty or contains only whitespace")]
    EmptyFile { path: PathBuf },

    /// Failed to parse config file
    #[error("Failed to parse config file at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to parse config text that did not come from a file
    #[error("Failed to parse config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// Config contains invalid values
    #[error("Config validation failed: {0}")]
    ValidationError(String),

    /// Config or cache directory path could not be determined
    #[error("Could not determine directory path: {reason}")]
    PathResolutionError { reason: String },
}

/// Validation error for a specific config field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path to the field (e.g., "network.max_retries")
    pub field: String,

    /// Human-readable error message
    pub message: String,

    /// The invalid value, if available
    pub value: Option<String>,
}

impl ValidationError {
    /// Creates a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Creates a validation error with the invalid value
    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Field '{}': {}", self.field, self.message)?;
        if let Some(ref value) = self.value {
            write!(f, " (got: {})", value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("server.username", "must not be empty");
        assert_eq!(err.to_string(), "Field 'server.username': must not be empty");
    }

    #[test]
    fn test_validation_error_with_value() {
        let err = ValidationError::with_value(
            "network.max_concurrent_requests",
            "must be between 1 and 16",
            "40",
        );
        assert_eq!(
            err.to_string(),
            "Field 'network.max_concurrent_requests': must be between 1 and 16 (got: 40)"
        );
    }

    #[test]
    fn test_empty_file_display() {
        let err = ConfigError::EmptyFile {
            path: PathBuf::from("/tmp/sublink.toml"),
        };
        assert!(err.to_string().contains("/tmp/sublink.toml"));
    }
}
