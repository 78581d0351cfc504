//! Command run loop

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::Utc;
use openapi_client::models::{BuildInfo, ProjectInfo};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::app::options::AppOptions;
use crate::app::render::{write_build_header, write_history, write_projects, LogPrinter};
use crate::app::state::AppState;
use crate::errors::DashboardError;
use crate::observe::snapshot::LogSnapshot;
use crate::observe::source::BuildSource;
use crate::surfaces::history::{HistoryBrowser, HistoryView};
use crate::surfaces::inline::InlineViewer;
use crate::workers::feed;

/// Dashboard command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List projects with their last build status
    Projects,

    /// Trigger a deployment
    Deploy { project_id: i64 },

    /// Follow the logs of a project's latest run
    Logs { project_id: i64 },

    /// List a project's builds, or follow one build's logs
    History {
        project_id: i64,
        build_id: Option<i64>,
    },
}

/// Run a dashboard command until it completes or shutdown is signalled
pub async fn run(
    command: Command,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DashboardError> {
    let state = AppState::init(&options)?;

    // Subscribed before the first await, so an early signal is never missed
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_handle = tokio::spawn(async move {
        shutdown_signal.await;
        let _ = shutdown_tx.send(true);
    });

    let mut signal_rx = shutdown_rx.clone();
    let result = tokio::select! {
        result = execute(command, &state, &options, shutdown_rx) => result,
        _ = shutdown_requested(&mut signal_rx) => {
            info!("Shutdown requested, stopping command...");
            Ok(())
        }
    };

    signal_handle.abort();
    state.shutdown();
    result
}

async fn execute(
    command: Command,
    state: &AppState,
    options: &AppOptions,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), DashboardError> {
    match command {
        Command::Projects => list_projects(state).await,
        Command::Deploy { project_id } => deploy(state, project_id).await,
        Command::Logs { project_id } => {
            follow_project_logs(state, options, project_id, shutdown_rx).await
        }
        Command::History {
            project_id,
            build_id: None,
        } => show_history(state, project_id).await,
        Command::History {
            project_id,
            build_id: Some(build_id),
        } => follow_history_build(state, options, project_id, build_id, shutdown_rx).await,
    }
}

/// Resolves once shutdown is signalled, including before the call
async fn shutdown_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    if shutdown_rx.wait_for(|requested| *requested).await.is_err() {
        // Signal task gone without signalling
        std::future::pending::<()>().await;
    }
}

async fn list_projects(state: &AppState) -> Result<(), DashboardError> {
    let projects = state.http_client.list_projects().await?;
    write_projects(&mut io::stdout().lock(), &projects)?;
    Ok(())
}

async fn deploy(state: &AppState, project_id: i64) -> Result<(), DashboardError> {
    let project = state.http_client.get_project(project_id).await?;
    state.http_client.deploy_project(project_id).await?;
    info!("Deployment triggered for project {}", project_id);
    println!("Deployment started for {}", project.name);
    Ok(())
}

async fn show_history(state: &AppState, project_id: i64) -> Result<(), DashboardError> {
    let project = state.http_client.get_project(project_id).await?;
    let mut browser = open_history(state, &project).await?;
    write_history(
        &mut io::stdout().lock(),
        &project.name,
        browser.builds(),
        Utc::now(),
    )?;
    browser.close();
    Ok(())
}

async fn open_history(
    state: &AppState,
    project: &ProjectInfo,
) -> Result<HistoryBrowser, DashboardError> {
    let source: Arc<dyn BuildSource> = state.http_client.clone();
    let mut browser = HistoryBrowser::new(
        state.registry.clone(),
        source,
        project.id,
        project.name.clone(),
    );
    browser.open().await;
    if let Some(message) = browser.list_error() {
        return Err(DashboardError::Internal(message.to_string()));
    }
    Ok(browser)
}

fn spawn_feed<T, P, PF>(
    options: feed::Options,
    name: String,
    fetch: P,
    feed_tx: mpsc::Sender<T>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    T: Send + 'static,
    P: Fn() -> PF + Send + Sync + 'static,
    PF: Future<Output = Result<T, DashboardError>> + Send + 'static,
{
    tokio::spawn(async move {
        feed::run(
            &options,
            &name,
            fetch,
            feed_tx,
            tokio::time::sleep,
            Box::pin(async move {
                shutdown_requested(&mut shutdown_rx).await;
            }),
        )
        .await;
    })
}

fn print_snapshot(printer: &mut LogPrinter, snapshot: &LogSnapshot) -> Result<(), DashboardError> {
    printer.print(&mut io::stdout().lock(), snapshot)?;
    Ok(())
}

async fn follow_project_logs(
    state: &AppState,
    options: &AppOptions,
    project_id: i64,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), DashboardError> {
    let project = state.http_client.get_project(project_id).await?;

    let mut viewer = InlineViewer::new(state.registry.clone());
    let Some(mut logs_rx) = viewer.show_project(&project)? else {
        println!("{} has not been built yet", project.name);
        return Ok(());
    };
    println!(
        "Build Logs: {}",
        project.last_pipeline_run_name.as_deref().unwrap_or_default()
    );

    let (feed_tx, mut feed_rx) = mpsc::channel::<ProjectInfo>(1);
    let client = state.http_client.clone();
    let feed_handle = spawn_feed(
        options.feed.clone(),
        format!("project {}", project_id),
        move || {
            let client = client.clone();
            async move { client.get_project(project_id).await }
        },
        feed_tx,
        shutdown_rx,
    );

    let mut printer = LogPrinter::default();
    loop {
        tokio::select! {
            changed = logs_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = logs_rx.borrow_and_update().clone();
                print_snapshot(&mut printer, &snapshot)?;
                if viewer.is_settled() {
                    break;
                }
            }
            Some(project) = feed_rx.recv() => {
                if let Some(receiver) = viewer.show_project(&project)? {
                    printer.reset();
                    println!(
                        "Build Logs: {}",
                        project.last_pipeline_run_name.as_deref().unwrap_or_default()
                    );
                    logs_rx = receiver;
                }
            }
        }
    }

    viewer.close();
    feed_handle.abort();
    io::stdout().flush()?;
    Ok(())
}

async fn follow_history_build(
    state: &AppState,
    options: &AppOptions,
    project_id: i64,
    build_id: i64,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<(), DashboardError> {
    let project = state.http_client.get_project(project_id).await?;
    let mut browser = open_history(state, &project).await?;
    let mut logs_rx: watch::Receiver<LogSnapshot> = browser.select(build_id)?;
    if let HistoryView::Detail(record) = browser.view() {
        write_build_header(&mut io::stdout().lock(), record, Utc::now())?;
    }

    let (feed_tx, mut feed_rx) = mpsc::channel::<Vec<BuildInfo>>(1);
    let source: Arc<dyn BuildSource> = state.http_client.clone();
    let feed_handle = spawn_feed(
        options.feed.clone(),
        format!("builds of project {}", project_id),
        move || {
            let source = source.clone();
            async move { source.list_builds(project_id).await }
        },
        feed_tx,
        shutdown_rx,
    );

    let mut printer = LogPrinter::default();
    loop {
        tokio::select! {
            changed = logs_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = logs_rx.borrow_and_update().clone();
                print_snapshot(&mut printer, &snapshot)?;
                if browser.is_settled() {
                    break;
                }
            }
            Some(builds) = feed_rx.recv() => {
                browser.apply_listing(builds);
            }
        }
    }

    browser.close();
    feed_handle.abort();
    io::stdout().flush()?;
    Ok(())
}
