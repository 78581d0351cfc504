//! Log synchronization for a single observed build
//!
//! A [`LogSynchronizer`] is one observation session: it is bound to a build
//! once, fetches the build's log immediately, and keeps polling on a fixed
//! interval for as long as the build is not finished. Fetches are never
//! serialized. Every fetch takes a sequence number before it is issued and a
//! result is only applied when its number is the highest seen so far, so a
//! slow response can never overwrite a newer one.
//!
//! ```text
//! Unbound -> FetchingInitial -> Polling -> FinalFetch -> Stopped
//! Unbound -> FetchingOnce -> Stopped
//! any     -> Stopped            (stop)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::DashboardError;
use crate::models::build::{BuildRef, LogFetch};
use crate::observe::snapshot::{FetchOutcome, LogSnapshot, RETRY_MESSAGE};
use crate::observe::source::LogFetcher;
use crate::observe::status::{classify, LifecycleState};

/// Synchronizer options
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Polling interval while the build is not finished
    pub interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not bound to a build
    Unbound,

    /// First fetch in flight, timer armed
    FetchingInitial,

    /// Timer armed, content received
    Polling,

    /// Build finished, last fetch in flight
    FinalFetch,

    /// Started on a finished build, single fetch in flight
    FetchingOnce,

    /// No further fetches will be issued
    Stopped,
}

struct Inner {
    build: Option<BuildRef>,
    phase: SyncPhase,
    lifecycle: LifecycleState,
    seen_terminal: bool,
    closed: bool,
    next_seq: u64,
    applied_seq: u64,
    settle_seq: Option<u64>,
    timer: Option<JoinHandle<()>>,
}

impl Inner {
    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Shared {
    id: Uuid,
    fetcher: Arc<dyn LogFetcher>,
    options: SyncOptions,
    inner: Mutex<Inner>,
    snapshot: watch::Sender<LogSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn spawn_fetch(self: &Arc<Self>, build: BuildRef, seq: u64) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            debug!("Session {} fetch #{} for {}", shared.id, seq, build);
            let result = shared.fetcher.fetch_log(&build).await;
            shared.apply(seq, result);
        });
    }

    fn tick(self: &Arc<Self>) {
        let (build, seq) = {
            let mut inner = self.lock();
            let polling = matches!(inner.phase, SyncPhase::FetchingInitial | SyncPhase::Polling);
            if inner.closed || !polling {
                return;
            }
            let Some(build) = inner.build.clone() else {
                return;
            };
            (build, inner.issue())
        };
        self.spawn_fetch(build, seq);
    }

    fn apply(&self, seq: u64, result: Result<LogFetch, DashboardError>) {
        let mut inner = self.lock();

        // In-flight fetches survive stop(); their results must not
        if inner.closed {
            debug!("Session {} discarding fetch #{}: stopped", self.id, seq);
            return;
        }
        if inner.settle_seq == Some(seq) {
            inner.phase = SyncPhase::Stopped;
        }
        if seq <= inner.applied_seq {
            debug!(
                "Session {} discarding fetch #{}: #{} already applied",
                self.id, seq, inner.applied_seq
            );
            return;
        }
        inner.applied_seq = seq;
        if inner.phase == SyncPhase::FetchingInitial {
            inner.phase = SyncPhase::Polling;
        }

        let previous = self.snapshot.borrow().text.clone();
        let next = match result {
            Ok(fetch) if fetch.found => LogSnapshot {
                text: fetch.text,
                outcome: Some(FetchOutcome::Ok),
                sequence: seq,
                message: None,
            },
            Ok(_) => {
                debug!("Session {} fetch #{}: log not available yet", self.id, seq);
                LogSnapshot {
                    text: previous,
                    outcome: Some(FetchOutcome::NotFound),
                    sequence: seq,
                    message: None,
                }
            }
            Err(e) => {
                warn!("Session {} fetch #{} failed: {}", self.id, seq, e);
                LogSnapshot {
                    text: previous,
                    outcome: Some(FetchOutcome::Error),
                    sequence: seq,
                    message: Some(RETRY_MESSAGE.to_string()),
                }
            }
        };
        self.snapshot.send_replace(next);
    }
}

fn arm_timer(shared: &Arc<Shared>) -> JoinHandle<()> {
    let period = shared.options.interval.max(Duration::from_millis(1));
    let start = Instant::now() + period;
    let weak: Weak<Shared> = Arc::downgrade(shared);

    tokio::spawn(async move {
        let mut ticker = time::interval_at(start, period);
        loop {
            ticker.tick().await;
            match weak.upgrade() {
                Some(shared) => shared.tick(),
                None => return,
            }
        }
    })
}

/// Polling log session for one build
///
/// Dropping the session stops it.
pub struct LogSynchronizer {
    shared: Arc<Shared>,
}

impl LogSynchronizer {
    /// Create an unbound session
    pub fn new(fetcher: Arc<dyn LogFetcher>, options: SyncOptions) -> Self {
        let (snapshot, _) = watch::channel(LogSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                fetcher,
                options,
                inner: Mutex::new(Inner {
                    build: None,
                    phase: SyncPhase::Unbound,
                    lifecycle: LifecycleState::Unknown,
                    seen_terminal: false,
                    closed: false,
                    next_seq: 0,
                    applied_seq: 0,
                    settle_seq: None,
                    timer: None,
                }),
                snapshot,
            }),
        }
    }

    /// Session id
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Bind the session to a build and issue the first fetch.
    ///
    /// Arms the polling timer unless `initial_status` is terminal, in which
    /// case the first fetch is also the last one.
    pub fn start(&self, build: BuildRef, initial_status: &str) -> Result<(), DashboardError> {
        let state = classify(initial_status);
        let seq = {
            let mut inner = self.shared.lock();
            if inner.closed || inner.phase != SyncPhase::Unbound {
                error!(
                    "Session {} started twice (phase {:?}, build {})",
                    self.shared.id, inner.phase, build
                );
                return Err(DashboardError::SessionMisuse(format!(
                    "start called in phase {:?}",
                    inner.phase
                )));
            }

            inner.build = Some(build.clone());
            inner.lifecycle = state;
            let seq = inner.issue();
            if state.is_terminal() {
                inner.seen_terminal = true;
                inner.phase = SyncPhase::FetchingOnce;
                inner.settle_seq = Some(seq);
            } else {
                inner.phase = SyncPhase::FetchingInitial;
                inner.timer = Some(arm_timer(&self.shared));
            }
            seq
        };

        info!(
            "Log session {} started for {} ({})",
            self.shared.id, build, state
        );
        self.shared.spawn_fetch(build, seq);
        Ok(())
    }

    /// Re-evaluate scheduling for a new status of the bound build
    pub fn update_status(&self, new_status: &str) -> Result<(), DashboardError> {
        let next = classify(new_status);
        let (build, seq) = {
            let mut inner = self.shared.lock();
            if inner.phase == SyncPhase::Unbound {
                error!(
                    "Session {} received status {:?} before start",
                    self.shared.id, new_status
                );
                return Err(DashboardError::SessionNotStarted);
            }
            if inner.closed {
                debug!(
                    "Session {} ignoring status {:?}: stopped",
                    self.shared.id, new_status
                );
                return Ok(());
            }

            if inner.seen_terminal {
                if next.is_terminal() {
                    return Ok(());
                }
                warn!(
                    "Session {} refusing status regression {} -> {}",
                    self.shared.id, inner.lifecycle, next
                );
                return Err(DashboardError::StatusRegression {
                    from: inner.lifecycle,
                    to: next,
                });
            }

            inner.lifecycle = next;
            if !next.is_terminal() {
                return Ok(());
            }

            inner.seen_terminal = true;
            inner.cancel_timer();
            let seq = inner.issue();
            inner.phase = SyncPhase::FinalFetch;
            inner.settle_seq = Some(seq);
            let Some(build) = inner.build.clone() else {
                return Err(DashboardError::Internal("bound session without build".to_string()));
            };
            (build, seq)
        };

        info!(
            "Log session {} for {} finished ({}), final fetch #{}",
            self.shared.id, build, next, seq
        );
        self.shared.spawn_fetch(build, seq);
        Ok(())
    }

    /// Stop polling and discard any result still in flight. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        inner.cancel_timer();
        inner.phase = SyncPhase::Stopped;
        match &inner.build {
            Some(build) => info!("Log session {} for {} stopped", self.shared.id, build),
            None => debug!("Unbound log session {} stopped", self.shared.id),
        }
    }

    /// Latest known content. Never fetches.
    pub fn snapshot(&self) -> LogSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Receiver notified on every applied fetch
    pub fn subscribe(&self) -> watch::Receiver<LogSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Current phase
    pub fn phase(&self) -> SyncPhase {
        self.shared.lock().phase
    }

    /// Last known lifecycle state of the build
    pub fn lifecycle(&self) -> LifecycleState {
        self.shared.lock().lifecycle
    }

    /// Bound build
    pub fn build(&self) -> Option<BuildRef> {
        self.shared.lock().build.clone()
    }

    /// Whether the polling timer is armed
    pub fn is_live(&self) -> bool {
        self.shared.lock().timer.is_some()
    }

    /// Whether no further fetch will be issued
    pub fn is_stopped(&self) -> bool {
        self.phase() == SyncPhase::Stopped
    }

    /// Whether `stop` was called
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Number of fetches issued so far
    pub fn issued_fetches(&self) -> u64 {
        self.shared.lock().next_seq
    }
}

impl Drop for LogSynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}
