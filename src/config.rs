//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the wizard engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote draft/entity store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the planner API, e.g. "https://planner.internal/api"
    #[serde(default)]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Debounced autosave settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet period after the last mutation before the write fires
    #[serde(default = "default_quiet_period")]
    pub quiet_period_secs: u64,
    /// Disable to suppress background writes entirely
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_quiet_period() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiet_period_secs: default_quiet_period(),
            enabled: default_true(),
        }
    }
}

impl AutosaveConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_secs(self.quiet_period_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write to a log file instead of stderr
    #[serde(default)]
    pub to_file: bool,
    /// Directory for log files when `to_file` is set
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
            dir: default_log_dir(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a JSON document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
