//! Media server connection settings

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Where the server is and how to log in
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Usually the LAN address, e.g. `http://192.168.1.10:4040`
    pub primary_url: Option<String>,

    /// Usually the external (DDNS) address
    pub secondary_url: Option<String>,

    pub username: String,

    /// Plain text, or already in `enc:<hex>` form
    pub password: String,

    /// Ask the server to transcode streams to MP3
    pub compatible_mode: bool,
}

impl ServerConfig {
    /// Returns true if at least one server URL is set
    pub fn has_endpoint(&self) -> bool {
        [&self.primary_url, &self.secondary_url]
            .iter()
            .any(|url| url.as_deref().is_some_and(|url| !url.trim().is_empty()))
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("primary_url", &self.primary_url)
            .field("secondary_url", &self.secondary_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("compatible_mode", &self.compatible_mode)
            .finish()
    }
}

impl ConfigSection for ServerConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::optional_url(self.primary_url.as_deref(), "server.primary_url"),
            Validator::optional_url(self.secondary_url.as_deref(), "server.secondary_url"),
        ])
    }

    fn merge(&mut self, other: Self) {
        if other.primary_url.is_some() {
            self.primary_url = other.primary_url;
        }
        if other.secondary_url.is_some() {
            self.secondary_url = other.secondary_url;
        }
        if !other.username.is_empty() {
            self.username = other.username;
        }
        if !other.password.is_empty() {
            self.password = other.password;
        }
        self.compatible_mode = other.compatible_mode;
    }

    fn section_name(&self) -> &'static str {
        "server"
    }
}
