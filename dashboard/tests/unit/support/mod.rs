//! Shared fakes for the unit tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kautodash::errors::DashboardError;
use kautodash::models::build::{BuildRef, LogFetch};
use kautodash::observe::source::{BuildSource, LogFetcher};
use openapi_client::models::BuildInfo;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Slack added to every advance so tasks woken at a deadline get to run
const SLACK: Duration = Duration::from_millis(10);

/// Let spawned fetches resolve without reaching the next poll
pub async fn settle() {
    tokio::time::sleep(SLACK).await;
}

/// Advance paused time by `secs` seconds plus a little slack
pub async fn advance(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs) + SLACK).await;
}

pub fn transient_error() -> DashboardError {
    DashboardError::Api {
        status: 502,
        body: "bad gateway".to_string(),
    }
}

/// Answers queued responses first, then a growing "step N" log
#[derive(Default)]
pub struct ScriptedFetcher {
    calls: AtomicUsize,
    queued: Mutex<VecDeque<Result<LogFetch, DashboardError>>>,
    requested: Mutex<Vec<BuildRef>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<LogFetch, DashboardError>) {
        self.queued.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<BuildRef> {
        self.requested.lock().unwrap().clone()
    }
}

/// Log text after `n` default answers
pub fn steps(n: usize) -> String {
    (1..=n).map(|i| format!("step {}\n", i)).collect()
}

#[async_trait]
impl LogFetcher for ScriptedFetcher {
    async fn fetch_log(&self, build: &BuildRef) -> Result<LogFetch, DashboardError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested.lock().unwrap().push(build.clone());
        match self.queued.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(LogFetch::found(steps(n))),
        }
    }
}

/// Holds every fetch until the test releases it
#[derive(Default)]
pub struct GatedFetcher {
    gates: Mutex<Vec<Option<oneshot::Sender<Result<LogFetch, DashboardError>>>>>,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.gates.lock().unwrap().iter().filter(|g| g.is_some()).count()
    }

    /// Resolve the `index`-th fetch (0-based, in issue order)
    pub fn resolve(&self, index: usize, response: Result<LogFetch, DashboardError>) {
        let gate = self.gates.lock().unwrap()[index].take();
        gate.expect("fetch already resolved").send(response).ok();
    }
}

#[async_trait]
impl LogFetcher for GatedFetcher {
    async fn fetch_log(&self, _build: &BuildRef) -> Result<LogFetch, DashboardError> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push(Some(tx));
        rx.await
            .unwrap_or_else(|_| Err(DashboardError::Internal("gate dropped".to_string())))
    }
}

/// In-memory build listing
#[derive(Default)]
pub struct FakeBuildSource {
    builds: Mutex<Vec<BuildInfo>>,
    failing: AtomicBool,
    list_calls: AtomicUsize,
    deploys: Mutex<Vec<i64>>,
}

impl FakeBuildSource {
    pub fn new(builds: Vec<BuildInfo>) -> Self {
        Self {
            builds: Mutex::new(builds),
            ..Default::default()
        }
    }

    pub fn set_builds(&self, builds: Vec<BuildInfo>) {
        *self.builds.lock().unwrap() = builds;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn deploys(&self) -> Vec<i64> {
        self.deploys.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildSource for FakeBuildSource {
    async fn list_builds(&self, _project_id: i64) -> Result<Vec<BuildInfo>, DashboardError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(transient_error());
        }
        Ok(self.builds.lock().unwrap().clone())
    }

    async fn trigger_deploy(&self, project_id: i64) -> Result<(), DashboardError> {
        self.deploys.lock().unwrap().push(project_id);
        Ok(())
    }
}

pub fn build_info(id: i64, run: &str, status: &str) -> BuildInfo {
    BuildInfo {
        id,
        pipeline_run_name: run.to_string(),
        status: status.to_string(),
        start_time: "2024-05-01T12:00:00Z".to_string(),
    }
}

/// Canned answer of the local backend
#[derive(Clone)]
pub struct Route {
    pub path: &'static str,
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Route {
    pub fn ok(path: &'static str, body: impl Into<String>) -> Self {
        Self {
            path,
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Minimal HTTP/1.1 backend on a loopback port. Unknown paths answer 404.
pub struct LocalBackend {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for LocalBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn local_backend(routes: Vec<Route>) -> LocalBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let routes = Arc::new(routes);

    let handle = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket, routes.clone()));
        }
    });
    LocalBackend { base_url, handle }
}

async fn answer(mut socket: TcpStream, routes: Arc<Vec<Route>>) {
    let mut buf = vec![0u8; 8192];
    let mut read = 0;
    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") && read < buf.len() {
        match socket.read(&mut buf[read..]).await {
            Ok(0) | Err(_) => return,
            Ok(n) => read += n,
        }
    }

    let head = String::from_utf8_lossy(&buf[..read]).to_string();
    let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
    let route = routes.iter().find(|r| r.path == path).cloned().unwrap_or(Route {
        path: "",
        status: 404,
        body: r#"{"detail":"Not found"}"#.to_string(),
        delay: Duration::ZERO,
    });

    tokio::time::sleep(route.delay).await;
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        route.status,
        route.body.len(),
        route.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
