//! Inline log viewer of a project card

use std::sync::Arc;

use openapi_client::models::ProjectInfo;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::DashboardError;
use crate::models::build::BuildRef;
use crate::observe::registry::{SessionRegistry, SurfaceId};
use crate::observe::snapshot::LogSnapshot;
use crate::observe::synchronizer::SyncPhase;

/// Shows the logs of one build for as long as the viewer is open
pub struct InlineViewer {
    registry: Arc<SessionRegistry>,
    surface: SurfaceId,
    bound: Option<BuildRef>,
}

impl InlineViewer {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let surface = registry.register_surface();
        Self {
            registry,
            surface,
            bound: None,
        }
    }

    /// Surface id in the registry
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Build currently shown
    pub fn bound(&self) -> Option<&BuildRef> {
        self.bound.as_ref()
    }

    /// Show `build` with its current status.
    ///
    /// Returns a receiver when a new session was bound. The same build only
    /// gets its status re-evaluated; `None` releases the session.
    pub fn show(
        &mut self,
        build: Option<BuildRef>,
        raw_status: &str,
    ) -> Result<Option<watch::Receiver<LogSnapshot>>, DashboardError> {
        let Some(build) = build else {
            self.close();
            return Ok(None);
        };

        if self.bound.as_ref() == Some(&build) {
            match self.registry.update_status(self.surface, raw_status) {
                Ok(()) => return Ok(None),
                Err(DashboardError::StatusRegression { from, to }) => {
                    warn!(
                        "Build {} went from {} back to {}, keeping final logs",
                        build, from, to
                    );
                    return Ok(None);
                }
                Err(DashboardError::SessionNotStarted) => {
                    warn!(
                        "Inline viewer {} lost its session for {}, binding again",
                        self.surface, build
                    );
                }
                Err(e) => return Err(e),
            }
        }

        debug!("Inline viewer {} showing {}", self.surface, build);
        let receiver = self.registry.bind(self.surface, build.clone(), raw_status)?;
        self.bound = Some(build);
        Ok(Some(receiver))
    }

    /// Show the latest run of a project card
    pub fn show_project(
        &mut self,
        project: &ProjectInfo,
    ) -> Result<Option<watch::Receiver<LogSnapshot>>, DashboardError> {
        self.show(BuildRef::latest_of(project), &project.last_build_status)
    }

    /// Latest snapshot, if a build is shown
    pub fn snapshot(&self) -> Option<LogSnapshot> {
        self.registry.snapshot(self.surface)
    }

    /// Live indicator
    pub fn is_live(&self) -> bool {
        self.registry.is_live(self.surface)
    }

    /// Whether the shown build's logs are final
    pub fn is_settled(&self) -> bool {
        self.registry.phase(self.surface) == Some(SyncPhase::Stopped)
    }

    /// Stop watching
    pub fn close(&mut self) {
        self.registry.release(self.surface);
        self.bound = None;
    }
}

impl Drop for InlineViewer {
    fn drop(&mut self) {
        self.close();
    }
}
