//! Build models

use std::fmt;

use chrono::{DateTime, Utc};
use openapi_client::models::{BuildInfo, ProjectInfo};
use serde::{Deserialize, Serialize};

use crate::observe::status::{classify, LifecycleState};
use crate::utils::parse_timestamp;

/// How a project is addressed in log URLs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectRef {
    /// Numeric project id
    Id(i64),

    /// Project name
    Name(String),
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{}", id),
            ProjectRef::Name(name) => f.write_str(name),
        }
    }
}

/// Identity of a build's logs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildRef {
    /// Owning project
    pub project: ProjectRef,

    /// Pipeline run name
    pub run_name: String,
}

impl BuildRef {
    pub fn new(project: ProjectRef, run_name: impl Into<String>) -> Self {
        Self {
            project,
            run_name: run_name.into(),
        }
    }

    /// Reference to the latest run of a project card, if it ever ran
    pub fn latest_of(project: &ProjectInfo) -> Option<Self> {
        project
            .last_pipeline_run_name
            .as_deref()
            .filter(|run| !run.is_empty())
            .map(|run| Self::new(ProjectRef::Id(project.id), run))
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.run_name)
    }
}

/// One entry of a project's build history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    /// Build id
    pub id: i64,

    /// Pipeline run name
    pub run_name: String,

    /// Status as reported by the backend
    pub raw_status: String,

    /// Start time as reported by the backend
    pub start_time: String,

    /// Parsed start time
    pub started_at: Option<DateTime<Utc>>,
}

impl BuildRecord {
    /// Classified status
    pub fn lifecycle(&self) -> LifecycleState {
        classify(&self.raw_status)
    }
}

impl From<BuildInfo> for BuildRecord {
    fn from(info: BuildInfo) -> Self {
        let started_at = parse_timestamp(&info.start_time);
        Self {
            id: info.id,
            run_name: info.pipeline_run_name,
            raw_status: info.status,
            start_time: info.start_time,
            started_at,
        }
    }
}

/// Result of a single log read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogFetch {
    /// Log text, empty when not found
    pub text: String,

    /// False when the log resource does not exist (yet)
    pub found: bool,
}

impl LogFetch {
    pub fn found(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            found: true,
        }
    }

    pub fn not_found() -> Self {
        Self::default()
    }
}
