//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::DashboardError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs
    #[serde(default)]
    pub log_json: bool,

    /// Also write logs to the storage logs directory
    #[serde(default)]
    pub log_to_file: bool,

    /// Backend configuration
    #[serde(default)]
    pub backend: BackendSettings,

    /// Interval between log polls of a running build, in seconds
    #[serde(default = "default_log_poll_interval")]
    pub log_poll_interval_secs: u64,

    /// Interval between build status refreshes, in seconds
    #[serde(default = "default_status_refresh_interval")]
    pub status_refresh_interval_secs: u64,
}

fn default_log_poll_interval() -> u64 {
    3
}

fn default_status_refresh_interval() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_to_file: false,
            backend: BackendSettings::default(),
            log_poll_interval_secs: default_log_poll_interval(),
            status_refresh_interval_secs: default_status_refresh_interval(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults when the file does not exist
    pub async fn load(file: &File) -> Result<Self, DashboardError> {
        Ok(file.read_json_opt().await?.unwrap_or_default())
    }

    pub fn log_poll_interval(&self) -> Duration {
        Duration::from_secs(self.log_poll_interval_secs.max(1))
    }

    pub fn status_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.status_refresh_interval_secs.max(1))
    }
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Base URL for the backend API
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "https://api.kautoploy.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
