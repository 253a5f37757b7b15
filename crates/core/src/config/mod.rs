//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DOCSHELF_*)
//! 2. TOML config file (if DOCSHELF_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DOCSHELF_*)
/// 2. TOML config file (if DOCSHELF_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL template of the content archive, containing `$VERSION`.
    ///
    /// A fragment selects the directory inside the archive, e.g.
    /// `https://codeload.github.com/org/repo/zip/refs/heads/$VERSION#*/doc/`.
    ///
    /// Set via DOCSHELF_CONTENT_URL environment variable. Required.
    #[serde(default)]
    pub content_url: String,

    /// Directory inside the archive to expose, overriding the URL fragment.
    ///
    /// May start with `*/` to stand for the archive's top-level directory.
    /// Set via DOCSHELF_CONTENT_DIR environment variable.
    #[serde(default)]
    pub content_dir: Option<String>,

    /// Version used when a request names no version.
    ///
    /// Set via DOCSHELF_DEFAULT_BRANCH environment variable.
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Seconds a fetched snapshot stays fresh.
    ///
    /// Set via DOCSHELF_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Deadline in milliseconds for each fetch run by the cache, including
    /// background refreshes.
    ///
    /// Set via DOCSHELF_REFRESH_TIMEOUT_MS environment variable.
    #[serde(default = "default_refresh_timeout_ms")]
    pub refresh_timeout_ms: u64,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via DOCSHELF_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum archive size in bytes.
    ///
    /// Set via DOCSHELF_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via DOCSHELF_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whether to download the default version at startup.
    ///
    /// Set via DOCSHELF_PREFETCH_DEFAULT environment variable.
    #[serde(default = "default_true")]
    pub prefetch_default: bool,
}

fn default_branch() -> String {
    "master".into()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_refresh_timeout_ms() -> u64 {
    60_000
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_bytes() -> usize {
    104_857_600 // 100MB
}

fn default_user_agent() -> String {
    "docshelf/0.1".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content_url: String::new(),
            content_dir: None,
            default_branch: default_branch(),
            cache_ttl_secs: default_cache_ttl_secs(),
            refresh_timeout_ms: default_refresh_timeout_ms(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            user_agent: default_user_agent(),
            prefetch_default: true,
        }
    }
}

impl AppConfig {
    /// Snapshot freshness window.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Deadline for fetches run by the cache.
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DOCSHELF_`
    /// 2. TOML file from `DOCSHELF_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DOCSHELF_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DOCSHELF_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
