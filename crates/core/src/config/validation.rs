//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use crate::version;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `content_url` is empty.
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `content_url` is insecure or does not resolve to an http(s) URL
    /// - `default_branch` is empty or not a valid version
    /// - `cache_ttl_secs` is 0
    /// - `timeout_ms` or `refresh_timeout_ms` is below 100ms or above 10 minutes
    /// - `max_bytes` is 0 or exceeds 1GB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "content_url".into(),
                hint: "Set DOCSHELF_CONTENT_URL environment variable".into(),
            });
        }

        if self.default_branch.is_empty() {
            return Err(ConfigError::Invalid { field: "default_branch".into(), reason: "must not be empty".into() });
        }
        if let Err(e) = version::validate_version(&self.default_branch) {
            return Err(ConfigError::Invalid { field: "default_branch".into(), reason: e.to_string() });
        }

        // Resolving the default version checks the template and the URL it produces.
        match version::resolve("", &self.content_url, &self.default_branch) {
            Ok(_) => {}
            Err(e @ (crate::Error::InsecureTemplate(_) | crate::Error::InvalidUrl(_))) => {
                return Err(ConfigError::Invalid { field: "content_url".into(), reason: e.to_string() });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "default_branch".into(), reason: e.to_string() });
            }
        }

        if self.content_dir.as_deref().is_some_and(|dir| dir.contains("..")) {
            return Err(ConfigError::Invalid { field: "content_dir".into(), reason: "must not contain '..'".into() });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("refresh_timeout_ms", self.refresh_timeout_ms)] {
            if value < 100 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
            }
            if value > 600_000 {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not exceed 10 minutes (600000ms)".into(),
                });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 1024 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 1GB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.refresh_timeout_ms < self.timeout_ms {
            tracing::warn!(
                refresh_timeout_ms = self.refresh_timeout_ms,
                timeout_ms = self.timeout_ms,
                "refresh_timeout_ms is shorter than timeout_ms; \
                 slow downloads will be cut off by the cache deadline"
            );
        }

        Ok(())
    }
}
