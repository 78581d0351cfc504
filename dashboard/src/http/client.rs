//! HTTP client implementation

use std::time::Duration;

use openapi_client::models::ErrorResponse;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::DashboardError;

/// HTTP client for the Kautoploy backend
pub struct HttpClient {
    client: Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DashboardError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url.trim_end_matches('/'))?,
            token: None,
        })
    }

    /// Attach a bearer token to every request
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Build the URL of an endpoint from raw path segments.
    ///
    /// Segments are percent-encoded, so run names may contain any character.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DashboardError::ConfigError(format!("Base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::CONTENT_TYPE, "application/json");
        match &self.token {
            Some(token) => request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    async fn check(method: &str, url: &Url, response: Response) -> Result<Response, DashboardError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        // Prefer the backend's `detail` over the raw JSON
        let body = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(ErrorResponse {
                detail: Some(serde_json::Value::String(detail)),
            }) => detail,
            Ok(ErrorResponse {
                detail: Some(detail),
            }) => detail.to_string(),
            _ => text,
        };
        error!("HTTP {} {} failed: {} - {}", method, url, status, body);
        Err(DashboardError::Api {
            status: status.as_u16(),
            body,
        })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, DashboardError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url.clone())).send().await?;
        let response = Self::check("GET", &url, response).await?;

        let body = response.json().await?;
        Ok(body)
    }

    /// Make a GET request, mapping 404 to `None`
    pub async fn get_optional<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<Option<T>, DashboardError> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);

        let response = self.authorize(self.client.get(url.clone())).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("GET {} -> 404", url);
            return Ok(None);
        }
        let response = Self::check("GET", &url, response).await?;

        let body = response.json().await?;
        Ok(Some(body))
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, DashboardError> {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);

        let response = self
            .authorize(self.client.post(url.clone()))
            .json(body)
            .send()
            .await?;
        let response = Self::check("POST", &url, response).await?;

        let body = response.json().await?;
        Ok(body)
    }
}
