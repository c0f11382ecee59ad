//! Runtime configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use hfp_route_core::Timeouts;
use hfp_route_core::timeouts::MAX_CONNECT_RETRIES;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Connection timing
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Connection timing, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// How long to wait for the stack to confirm audio
    #[serde(default = "default_pending_timeout_ms")]
    pub pending_timeout_ms: u64,
    /// Delay before a failed connection is reissued
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Reissued connections allowed after a failure (at most 1)
    #[serde(default)]
    pub max_connect_retries: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            pending_timeout_ms: default_pending_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_connect_retries: 0,
        }
    }
}

fn default_pending_timeout_ms() -> u64 {
    5000
}

fn default_retry_backoff_ms() -> u64 {
    500
}

impl TimeoutConfig {
    /// Convert to the timing parameters the state machine uses.
    #[must_use]
    pub fn to_timeouts(&self) -> Timeouts {
        if self.max_connect_retries > MAX_CONNECT_RETRIES {
            warn!(
                configured = self.max_connect_retries,
                max = MAX_CONNECT_RETRIES,
                "Clamping connection retries"
            );
        }
        Timeouts::new(
            Duration::from_millis(self.pending_timeout_ms),
            Duration::from_millis(self.retry_backoff_ms),
            self.max_connect_retries,
        )
    }
}

/// Load configuration from the default location, or defaults if absent.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Load configuration from `path`, or defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        Ok(config)
    } else {
        info!(?path, "Config file not found, using defaults");
        Ok(Config::default())
    }
}

/// Get the configuration file path.
fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "hfp-route", "HfpRoute")
        .context("Could not determine config directory")?;
    Ok(dirs.config_dir().join("config.toml"))
}
