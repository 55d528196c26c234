//! Service configuration

use serde::{Deserialize, Serialize};

use crate::constants;

/// Platform version constant
pub const PLATFORM_VERSION: &str = "1.0.0";

/// Configuration for the matchmaking service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Suggestions returned when the caller passes no limit
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    /// Hard cap on caller-supplied suggestion limits
    #[serde(default = "default_suggestion_limit_cap")]
    pub suggestion_limit_cap: usize,
    /// Students a mentor takes per skill before being skipped
    #[serde(default = "default_mentor_capacity")]
    pub mentor_capacity: u32,
    /// Access token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    /// Announcement page size
    #[serde(default = "default_page_size")]
    pub announcement_page_size: usize,
    /// Platform version
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_suggestion_limit() -> usize {
    constants::DEFAULT_SUGGESTION_LIMIT
}

fn default_suggestion_limit_cap() -> usize {
    constants::MAX_SUGGESTION_LIMIT
}

fn default_mentor_capacity() -> u32 {
    constants::DEFAULT_MENTOR_CAPACITY
}

fn default_token_ttl_hours() -> i64 {
    // tokens live for a week
    24 * 7
}

fn default_page_size() -> usize {
    constants::DEFAULT_PAGE_SIZE
}

fn default_version() -> String {
    PLATFORM_VERSION.to_string()
}

impl ServiceConfig {
    /// Set the per-skill mentor capacity
    pub fn with_mentor_capacity(mut self, capacity: u32) -> Self {
        self.mentor_capacity = capacity;
        self
    }

    /// Set the default suggestion limit
    pub fn with_suggestion_limit(mut self, limit: usize) -> Self {
        self.suggestion_limit = limit;
        self
    }

    /// Set the access token lifetime
    pub fn with_token_ttl_hours(mut self, hours: i64) -> Self {
        self.token_ttl_hours = hours;
        self
    }

    /// Clamp a caller-supplied suggestion limit into the allowed range,
    /// falling back to the configured default when absent
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.suggestion_limit)
            .clamp(1, self.suggestion_limit_cap)
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: default_suggestion_limit(),
            suggestion_limit_cap: default_suggestion_limit_cap(),
            mentor_capacity: default_mentor_capacity(),
            token_ttl_hours: default_token_ttl_hours(),
            announcement_page_size: default_page_size(),
            version: default_version(),
        }
    }
}
