//! Build history browser
//!
//! Two levels: the project's build list, and the logs of one selected build.
//! Leaving the detail view always releases its session and clears the
//! displayed logs.

use std::sync::Arc;

use openapi_client::models::BuildInfo;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::errors::DashboardError;
use crate::models::build::{BuildRecord, BuildRef, ProjectRef};
use crate::observe::registry::{SessionRegistry, SurfaceId};
use crate::observe::snapshot::LogSnapshot;
use crate::observe::source::BuildSource;
use crate::observe::synchronizer::SyncPhase;

/// Shown instead of the list when it could not be fetched
pub const LIST_ERROR_MESSAGE: &str = "Failed to fetch build history";

/// What the browser displays
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryView {
    Closed,
    List,
    Detail(BuildRecord),
}

/// History browser of one project
pub struct HistoryBrowser {
    registry: Arc<SessionRegistry>,
    source: Arc<dyn BuildSource>,
    surface: SurfaceId,
    project_id: i64,
    project_name: String,
    builds: Vec<BuildRecord>,
    view: HistoryView,
    list_error: Option<String>,
}

impl HistoryBrowser {
    pub fn new(
        registry: Arc<SessionRegistry>,
        source: Arc<dyn BuildSource>,
        project_id: i64,
        project_name: impl Into<String>,
    ) -> Self {
        let surface = registry.register_surface();
        Self {
            registry,
            source,
            surface,
            project_id,
            project_name: project_name.into(),
            builds: Vec::new(),
            view: HistoryView::Closed,
            list_error: None,
        }
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn view(&self) -> &HistoryView {
        &self.view
    }

    pub fn builds(&self) -> &[BuildRecord] {
        &self.builds
    }

    /// Why the list is empty, if fetching it failed
    pub fn list_error(&self) -> Option<&str> {
        self.list_error.as_deref()
    }

    /// Open (or re-open) the browser on a freshly fetched build list
    pub async fn open(&mut self) -> &[BuildRecord] {
        self.registry.release(self.surface);
        self.builds.clear();
        self.view = HistoryView::List;

        match self.source.list_builds(self.project_id).await {
            Ok(builds) => {
                self.list_error = None;
                self.builds = builds.into_iter().map(BuildRecord::from).collect();
                debug!(
                    "History of project {}: {} builds",
                    self.project_id,
                    self.builds.len()
                );
            }
            Err(e) => {
                error!("Fetch builds error for project {}: {}", self.project_id, e);
                self.list_error = Some(LIST_ERROR_MESSAGE.to_string());
            }
        }
        &self.builds
    }

    /// Show the logs of a build from the list
    pub fn select(&mut self, build_id: i64) -> Result<watch::Receiver<LogSnapshot>, DashboardError> {
        if self.view == HistoryView::Closed {
            return Err(DashboardError::SessionMisuse(
                "select on a closed history browser".to_string(),
            ));
        }
        let record = self
            .builds
            .iter()
            .find(|b| b.id == build_id)
            .cloned()
            .ok_or_else(|| DashboardError::NotFound(format!("build {}", build_id)))?;

        let build = BuildRef::new(
            ProjectRef::Name(self.project_name.clone()),
            record.run_name.clone(),
        );
        let receiver = self.registry.bind(self.surface, build, &record.raw_status)?;
        self.view = HistoryView::Detail(record);
        Ok(receiver)
    }

    /// Back to the list
    pub fn back(&mut self) {
        self.registry.release(self.surface);
        if self.view != HistoryView::Closed {
            self.view = HistoryView::List;
        }
    }

    /// Close the browser
    pub fn close(&mut self) {
        self.registry.release(self.surface);
        self.builds.clear();
        self.list_error = None;
        self.view = HistoryView::Closed;
    }

    /// Replace the list with a newer listing and re-evaluate the selected
    /// build's session with its new status.
    pub fn apply_listing(&mut self, builds: Vec<BuildInfo>) {
        if self.view == HistoryView::Closed {
            return;
        }
        self.builds = builds.into_iter().map(BuildRecord::from).collect();
        self.list_error = None;

        let HistoryView::Detail(selected) = &self.view else {
            return;
        };
        let Some(latest) = self.builds.iter().find(|b| b.id == selected.id).cloned() else {
            return;
        };
        if latest.lifecycle() != selected.lifecycle() {
            match self.registry.update_status(self.surface, &latest.raw_status) {
                Ok(()) => {}
                Err(DashboardError::StatusRegression { from, to }) => {
                    warn!(
                        "Build {} went from {} back to {}, keeping final logs",
                        latest.id, from, to
                    );
                }
                Err(e) => error!("Status update for build {} failed: {}", latest.id, e),
            }
        }
        self.view = HistoryView::Detail(latest);
    }

    /// Re-fetch the list, keeping the current view
    pub async fn refresh(&mut self) -> Result<(), DashboardError> {
        if self.view == HistoryView::Closed {
            return Ok(());
        }
        let builds = self.source.list_builds(self.project_id).await?;
        self.apply_listing(builds);
        Ok(())
    }

    /// Latest snapshot of the selected build
    pub fn snapshot(&self) -> Option<LogSnapshot> {
        match self.view {
            HistoryView::Detail(_) => self.registry.snapshot(self.surface),
            _ => None,
        }
    }

    /// Log pane text; empty outside the detail view
    pub fn rendered_logs(&self) -> String {
        self.snapshot().map(|s| s.render()).unwrap_or_default()
    }

    /// Whether the selected build's logs are final
    pub fn is_settled(&self) -> bool {
        self.registry.phase(self.surface) == Some(SyncPhase::Stopped)
    }

    /// Live indicator of the selected build
    pub fn is_live(&self) -> bool {
        self.registry.is_live(self.surface)
    }
}

impl Drop for HistoryBrowser {
    fn drop(&mut self) {
        self.registry.release(self.surface);
    }
}
