//! Build API client

use openapi_client::models::{BuildInfo, LogsResponse};

use crate::errors::DashboardError;
use crate::http::client::HttpClient;
use crate::models::build::{BuildRef, ProjectRef};

impl HttpClient {
    /// List a project's builds, most recent first
    pub async fn list_project_builds(&self, project_id: i64) -> Result<Vec<BuildInfo>, DashboardError> {
        let id = project_id.to_string();
        self.get(&["projects", &id, "builds"]).await
    }

    /// Read the logs of a build. `None` when the backend has no log resource.
    pub async fn get_build_logs(&self, build: &BuildRef) -> Result<Option<LogsResponse>, DashboardError> {
        match &build.project {
            ProjectRef::Name(name) => {
                self.get_optional(&["builds", name, &build.run_name, "logs"])
                    .await
            }
            // Runs are unique across projects
            ProjectRef::Id(_) => self.get_optional(&["builds", &build.run_name, "logs"]).await,
        }
    }
}
