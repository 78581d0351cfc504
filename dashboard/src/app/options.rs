//! Application configuration options

use std::time::Duration;

use secrecy::SecretString;

use crate::observe::synchronizer::SyncOptions;
use crate::storage::settings::Settings;
use crate::workers::feed;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Bearer token of the stored login
    pub token: Option<SecretString>,

    /// Log synchronizer options
    pub sync: SyncOptions,

    /// Status feed options
    pub feed: feed::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            backend_base_url: "https://api.kautoploy.com".to_string(),
            request_timeout: Duration::from_secs(30),
            token: None,
            sync: SyncOptions::default(),
            feed: feed::Options::default(),
        }
    }
}

impl AppOptions {
    /// Options from the settings file
    pub fn from_settings(settings: &Settings, token: Option<SecretString>) -> Self {
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            request_timeout: settings.backend.request_timeout(),
            token,
            sync: SyncOptions {
                interval: settings.log_poll_interval(),
            },
            feed: feed::Options {
                interval: settings.status_refresh_interval(),
            },
            ..Default::default()
        }
    }
}
