//! API models

use serde::{Deserialize, Serialize};

/// Project as listed by `GET /projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: i64,
    pub name: String,
    pub git_url: String,
    pub framework: String,
    #[serde(default)]
    pub deployed_url: Option<String>,
    pub last_build_status: String,
    #[serde(default)]
    pub last_pipeline_run_name: Option<String>,
}

/// Build as listed by `GET /projects/{id}/builds`, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    pub id: i64,
    pub pipeline_run_name: String,
    pub status: String,
    pub start_time: String,
}

/// Build log payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Option<String>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}
