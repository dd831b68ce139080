//! Request timing, retry and concurrency settings

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Network behavior settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Deadline for a whole HTTP request
    pub request_timeout_secs: u64,

    /// Deadline for route selection pings
    pub probe_timeout_secs: u64,

    /// Artwork downloads allowed in flight at once
    pub max_concurrent_requests: usize,

    /// Retries after the first attempt for 429/502/503 responses
    pub max_retries: usize,

    /// Wait before the first retry; doubles for each one after
    pub initial_backoff_ms: u64,

    /// On cellular, probe only the secondary URL
    pub secondary_only_on_cellular: bool,

    pub user_agent: String,
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            probe_timeout_secs: 2,
            max_concurrent_requests: 3,
            max_retries: 3,
            initial_backoff_ms: 1000,
            secondary_only_on_cellular: true,
            user_agent: format!("sublink/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConfigSection for NetworkConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(self.request_timeout_secs, 1, 300, "network.request_timeout_secs"),
            Validator::in_range(self.probe_timeout_secs, 1, 60, "network.probe_timeout_secs"),
            Validator::in_range(
                self.max_concurrent_requests,
                1,
                16,
                "network.max_concurrent_requests",
            ),
            Validator::in_range(self.max_retries, 0, 10, "network.max_retries"),
            Validator::in_range(self.initial_backoff_ms, 0, 60_000, "network.initial_backoff_ms"),
            Validator::not_empty(&self.user_agent, "network.user_agent"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.request_timeout_secs = other.request_timeout_secs;
        self.probe_timeout_secs = other.probe_timeout_secs;
        self.max_concurrent_requests = other.max_concurrent_requests;
        self.max_retries = other.max_retries;
        self.initial_backoff_ms = other.initial_backoff_ms;
        self.secondary_only_on_cellular = other.secondary_only_on_cellular;
        self.user_agent = other.user_agent;
    }

    fn section_name(&self) -> &'static str {
        "network"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
        assert_eq!(config.initial_backoff(), Duration::from_secs(1));
        assert_eq!(config.max_concurrent_requests, 3);
        assert_eq!(config.max_retries, 3);
        assert!(config.secondary_only_on_cellular);
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let config = NetworkConfig {
            max_concurrent_requests: 0,
            ..NetworkConfig::default()
        };
        let errors = config.validate().expect_err("invalid");
        assert_eq!(errors[0].field, "network.max_concurrent_requests");
    }

    #[test]
    fn test_collects_every_error() {
        let config = NetworkConfig {
            request_timeout_secs: 0,
            probe_timeout_secs: 0,
            user_agent: String::new(),
            ..NetworkConfig::default()
        };
        assert_eq!(config.validate().map_err(|e| e.len()), Err(3));
    }
}
