//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::DashboardError;
use crate::http::client::HttpClient;
use crate::observe::registry::SessionRegistry;

/// Main application state
pub struct AppState {
    /// HTTP client for backend communication
    pub http_client: Arc<HttpClient>,

    /// Log sessions of every open surface
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, DashboardError> {
        info!("Initializing dashboard state for {}...", options.backend_base_url);

        let mut http_client = HttpClient::new(&options.backend_base_url, options.request_timeout)?;
        if let Some(token) = &options.token {
            http_client = http_client.with_token(token.clone());
        }
        let http_client = Arc::new(http_client);

        let registry = Arc::new(SessionRegistry::new(
            http_client.clone(),
            options.sync.clone(),
        ));

        Ok(Self {
            http_client,
            registry,
        })
    }

    /// Shutdown application state
    pub fn shutdown(&self) {
        info!(
            "Shutting down dashboard state ({} log sessions)...",
            self.registry.session_count()
        );
        self.registry.release_all();
    }
}
