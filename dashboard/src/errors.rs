//! Error types for the Kautoploy dashboard client

use thiserror::Error;

use crate::observe::status::LifecycleState;

/// Main error type for the dashboard client
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Log session used before start")]
    SessionNotStarted,

    #[error("Log session misuse: {0}")]
    SessionMisuse(String),

    #[error("Unsupported status transition: {from} -> {to}")]
    StatusRegression {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashboardError {
    /// Whether the error is an HTTP 404 from the backend
    pub fn is_not_found(&self) -> bool {
        match self {
            DashboardError::Api { status, .. } => *status == 404,
            DashboardError::HttpError(e) => e.status().map(|s| s.as_u16()) == Some(404),
            DashboardError::NotFound(_) => true,
            _ => false,
        }
    }
}
