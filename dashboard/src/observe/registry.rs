//! Session registry
//!
//! Owned by the coordinating layer and handed to each observation surface.
//! Every surface gets a [`SurfaceId`] and at most one log session at a time,
//! so releasing a surface always leaves it with zero timers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use crate::errors::DashboardError;
use crate::models::build::BuildRef;
use crate::observe::snapshot::LogSnapshot;
use crate::observe::source::LogFetcher;
use crate::observe::synchronizer::{LogSynchronizer, SyncOptions, SyncPhase};

/// Identity of an observation surface instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(Uuid);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Log sessions by surface
pub struct SessionRegistry {
    fetcher: Arc<dyn LogFetcher>,
    options: SyncOptions,
    sessions: Mutex<HashMap<SurfaceId, LogSynchronizer>>,
}

impl SessionRegistry {
    pub fn new(fetcher: Arc<dyn LogFetcher>, options: SyncOptions) -> Self {
        Self {
            fetcher,
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SurfaceId, LogSynchronizer>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocate an id for a new surface
    pub fn register_surface(&self) -> SurfaceId {
        SurfaceId(Uuid::new_v4())
    }

    /// Start a fresh session for `build` on `surface`, replacing (and
    /// stopping) whatever the surface watched before.
    pub fn bind(
        &self,
        surface: SurfaceId,
        build: BuildRef,
        status: &str,
    ) -> Result<watch::Receiver<LogSnapshot>, DashboardError> {
        let session = LogSynchronizer::new(self.fetcher.clone(), self.options.clone());
        let receiver = session.subscribe();

        let previous = {
            let mut sessions = self.lock();
            sessions.remove(&surface)
        };
        if let Some(previous) = previous {
            debug!("Surface {} replacing session {}", surface, previous.id());
            previous.stop();
        }

        session.start(build, status)?;
        self.lock().insert(surface, session);
        Ok(receiver)
    }

    /// Forward a status change to the surface's session
    pub fn update_status(&self, surface: SurfaceId, status: &str) -> Result<(), DashboardError> {
        let sessions = self.lock();
        match sessions.get(&surface) {
            Some(session) => session.update_status(status),
            None => Err(DashboardError::SessionNotStarted),
        }
    }

    /// Stop and forget the surface's session. Returns whether there was one.
    pub fn release(&self, surface: SurfaceId) -> bool {
        let session = self.lock().remove(&surface);
        match session {
            Some(session) => {
                session.stop();
                debug!("Surface {} released session {}", surface, session.id());
                true
            }
            None => false,
        }
    }

    /// Stop every session
    pub fn release_all(&self) {
        let sessions: Vec<_> = self.lock().drain().collect();
        for (_, session) in sessions {
            session.stop();
        }
    }

    /// Build watched by the surface
    pub fn bound_build(&self, surface: SurfaceId) -> Option<BuildRef> {
        self.lock().get(&surface).and_then(|s| s.build())
    }

    /// Latest snapshot of the surface's session
    pub fn snapshot(&self, surface: SurfaceId) -> Option<LogSnapshot> {
        self.lock().get(&surface).map(|s| s.snapshot())
    }

    /// Phase of the surface's session
    pub fn phase(&self, surface: SurfaceId) -> Option<SyncPhase> {
        self.lock().get(&surface).map(|s| s.phase())
    }

    /// Whether the surface's session is polling
    pub fn is_live(&self, surface: SurfaceId) -> bool {
        self.lock().get(&surface).is_some_and(|s| s.is_live())
    }

    /// Number of armed polling timers across all surfaces
    pub fn armed_timers(&self) -> usize {
        self.lock().values().filter(|s| s.is_live()).count()
    }

    /// Number of sessions held
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
