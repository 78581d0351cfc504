//! Project API client

use openapi_client::models::ProjectInfo;

use crate::errors::DashboardError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// List the user's projects
    pub async fn list_projects(&self) -> Result<Vec<ProjectInfo>, DashboardError> {
        self.get(&["projects"]).await
    }

    /// Get a single project from the project list
    pub async fn get_project(&self, project_id: i64) -> Result<ProjectInfo, DashboardError> {
        self.list_projects()
            .await?
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| DashboardError::NotFound(format!("project {}", project_id)))
    }

    /// Start a deployment. Progress is observed through the build status.
    pub async fn deploy_project(&self, project_id: i64) -> Result<(), DashboardError> {
        let id = project_id.to_string();
        let _: serde_json::Value = self
            .post(&["projects", &id, "deploy"], &serde_json::json!({}))
            .await?;
        Ok(())
    }
}
