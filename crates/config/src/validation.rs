//! Validation system for configuration values
//!
//! Each config section implements [`ConfigSection`], so new sections can be
//! added without touching the loader.

pub use crate::error::ValidationError;
use url::Url;

/// Trait for configuration sections that can validate themselves
pub trait ConfigSection: Default {
    /// Validates the configuration section
    ///
    /// Returns every problem found. `Ok` means valid.
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges another config section into this one
    ///
    /// Values from `other` take precedence.
    fn merge(&mut self, other: Self);

    /// Returns the section name for error reporting
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value is within a range
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is not empty
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, "must not be empty"))
        } else {
            Ok(())
        }
    }

    /// Validates that a string is an absolute http(s) URL
    pub fn valid_url(value: &str, field: &str) -> Result<(), ValidationError> {
        match Url::parse(value.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Ok(()),
            Ok(url) => Err(ValidationError::with_value(
                field,
                format!("unsupported URL scheme '{}'", url.scheme()),
                value,
            )),
            Err(e) => Err(ValidationError::with_value(
                field,
                format!("is not a valid URL: {}", e),
                value,
            )),
        }
    }

    /// Like [`valid_url`](Self::valid_url), but unset or blank values pass
    pub fn optional_url(value: Option<&str>, field: &str) -> Result<(), ValidationError> {
        match value.map(str::trim) {
            Some(url) if !url.is_empty() => Self::valid_url(url, field),
            _ => Ok(()),
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
