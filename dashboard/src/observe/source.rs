//! Remote collaborators of the observation layer

use async_trait::async_trait;
use openapi_client::models::BuildInfo;

use crate::errors::DashboardError;
use crate::http::client::HttpClient;
use crate::models::build::{BuildRef, LogFetch};

/// Idempotent read of a build's log
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Fetch the current log text. A missing log is `Ok` with `found == false`.
    async fn fetch_log(&self, build: &BuildRef) -> Result<LogFetch, DashboardError>;
}

/// Build listing and deployment trigger
#[async_trait]
pub trait BuildSource: Send + Sync {
    /// List a project's builds, most recent first. Always a full re-fetch.
    async fn list_builds(&self, project_id: i64) -> Result<Vec<BuildInfo>, DashboardError>;

    /// Start a deployment. Success shows up later in the build status.
    async fn trigger_deploy(&self, project_id: i64) -> Result<(), DashboardError>;
}

#[async_trait]
impl LogFetcher for HttpClient {
    async fn fetch_log(&self, build: &BuildRef) -> Result<LogFetch, DashboardError> {
        match self.get_build_logs(build).await? {
            Some(response) => Ok(LogFetch::found(response.logs.unwrap_or_default())),
            None => Ok(LogFetch::not_found()),
        }
    }
}

#[async_trait]
impl BuildSource for HttpClient {
    async fn list_builds(&self, project_id: i64) -> Result<Vec<BuildInfo>, DashboardError> {
        self.list_project_builds(project_id).await
    }

    async fn trigger_deploy(&self, project_id: i64) -> Result<(), DashboardError> {
        self.deploy_project(project_id).await
    }
}
