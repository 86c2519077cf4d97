//! Configuration management system for vocp
//!
//! Settings are layered: built-in defaults, then the first configuration file
//! found (YAML, TOML or JSON), then `VOCP__*` environment variables.
//!
//! # Examples
//!
//! ```rust
//! use vocp_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_env_prefix("VOCP")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! assert_eq!(config.retry.max_ignored_retries, 100);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for vocp
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Remote node store settings
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Transfer retry settings
    #[serde(default)]
    pub retry: RetryConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote node store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// URI schemes that address the remote store (`vos` for `vos:path`)
    #[serde(default = "default_schemes")]
    pub schemes: Vec<String>,
    /// Local directory that backs the remote namespace, for offline use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            schemes: default_schemes(),
            store_root: None,
        }
    }
}

fn default_schemes() -> Vec<String> {
    vec!["vos".to_string()]
}

/// Retry configuration for non-transient transfer errors under `--ignore`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries spent on one item before it is skipped
    #[serde(default = "default_max_ignored_retries")]
    pub max_ignored_retries: u32,
    /// Wait between those retries, in seconds
    #[serde(default = "default_retry_wait_secs")]
    pub retry_wait_secs: u64,
}

impl RetryConfig {
    /// Wait between retries
    pub fn retry_wait(&self) -> Duration {
        Duration::from_secs(self.retry_wait_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_ignored_retries: default_max_ignored_retries(),
            retry_wait_secs: default_retry_wait_secs(),
        }
    }
}

fn default_max_ignored_retries() -> u32 {
    100
}

fn default_retry_wait_secs() -> u64 {
    5
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when neither `RUST_LOG` nor a CLI flag sets one
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable colored output
    #[serde(default = "default_colored_output")]
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            colored_output: default_colored_output(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_colored_output() -> bool {
    true
}
