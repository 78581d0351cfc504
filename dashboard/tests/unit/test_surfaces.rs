//! Observation surface unit tests

mod support;

use std::sync::Arc;

use kautodash::errors::DashboardError;
use kautodash::models::build::{BuildRef, ProjectRef};
use kautodash::observe::registry::SessionRegistry;
use kautodash::observe::snapshot::LOADING_PLACEHOLDER;
use kautodash::observe::synchronizer::SyncOptions;
use kautodash::surfaces::history::{HistoryBrowser, HistoryView, LIST_ERROR_MESSAGE};
use kautodash::surfaces::inline::InlineViewer;
use openapi_client::models::ProjectInfo;

use support::{advance, build_info, settle, steps, FakeBuildSource, ScriptedFetcher};

fn registry(fetcher: &Arc<ScriptedFetcher>) -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new(fetcher.clone(), SyncOptions::default()))
}

fn project(run: Option<&str>, status: &str) -> ProjectInfo {
    ProjectInfo {
        id: 7,
        name: "shop".to_string(),
        git_url: "https://github.com/acme/shop.git".to_string(),
        framework: "react".to_string(),
        deployed_url: None,
        last_build_status: status.to_string(),
        last_pipeline_run_name: run.map(str::to_string),
    }
}

fn history(
    registry: &Arc<SessionRegistry>,
    source: &Arc<FakeBuildSource>,
) -> HistoryBrowser {
    HistoryBrowser::new(registry.clone(), source.clone(), 7, "shop")
}

#[tokio::test(start_paused = true)]
async fn test_inline_binds_latest_run_by_project_id() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let mut viewer = InlineViewer::new(registry.clone());

    let logs_rx = viewer.show_project(&project(Some("run-42"), "running")).unwrap();
    assert!(logs_rx.is_some());
    assert!(viewer.is_live());
    assert_eq!(
        viewer.bound(),
        Some(&BuildRef::new(ProjectRef::Id(7), "run-42"))
    );

    settle().await;
    assert_eq!(fetcher.requested(), vec![BuildRef::new(ProjectRef::Id(7), "run-42")]);
    assert_eq!(viewer.snapshot().unwrap().text, steps(1));
}

#[tokio::test(start_paused = true)]
async fn test_inline_without_run_shows_nothing() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let mut viewer = InlineViewer::new(registry.clone());

    assert!(viewer.show_project(&project(None, "new")).unwrap().is_none());
    assert!(viewer.show_project(&project(Some(""), "new")).unwrap().is_none());
    assert_eq!(registry.session_count(), 0);
    settle().await;
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_inline_rebind_keeps_one_timer() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let mut viewer = InlineViewer::new(registry.clone());

    viewer.show_project(&project(Some("run-1"), "running")).unwrap();
    settle().await;
    let logs_rx = viewer.show_project(&project(Some("run-2"), "running")).unwrap();
    assert!(logs_rx.is_some());
    assert_eq!(registry.armed_timers(), 1);
    assert_eq!(registry.session_count(), 1);

    // The new session starts from scratch
    assert_eq!(viewer.snapshot().unwrap().render(), LOADING_PLACEHOLDER);

    advance(3.0).await;
    let requested = fetcher.requested();
    assert_eq!(requested.len(), 3);
    assert!(requested[1..].iter().all(|b| b.run_name == "run-2"));
}

#[tokio::test(start_paused = true)]
async fn test_inline_status_change_finishes_session() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let mut viewer = InlineViewer::new(registry.clone());

    viewer.show_project(&project(Some("run-42"), "running")).unwrap();
    settle().await;
    advance(1.0).await;

    // Same build: no new session, just the final fetch
    let logs_rx = viewer.show_project(&project(Some("run-42"), "succeeded")).unwrap();
    assert!(logs_rx.is_none());
    assert!(!viewer.is_live());

    settle().await;
    assert!(viewer.is_settled());
    assert_eq!(registry.armed_timers(), 0);

    // A regression is refused but the viewer keeps the final logs
    let logs_rx = viewer.show_project(&project(Some("run-42"), "running")).unwrap();
    assert!(logs_rx.is_none());
    assert!(viewer.is_settled());

    advance(30.0).await;
    assert_eq!(fetcher.calls(), 2);
    assert_eq!(viewer.snapshot().unwrap().text, steps(2));
}

#[tokio::test(start_paused = true)]
async fn test_inline_close_and_drop_release_timers() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);

    let mut closed = InlineViewer::new(registry.clone());
    closed.show_project(&project(Some("run-1"), "running")).unwrap();
    let dropped = {
        let mut viewer = InlineViewer::new(registry.clone());
        viewer.show_project(&project(Some("run-1"), "running")).unwrap();
        viewer
    };
    assert_eq!(registry.armed_timers(), 2);

    closed.close();
    assert!(closed.bound().is_none());
    assert_eq!(registry.armed_timers(), 1);

    drop(dropped);
    assert_eq!(registry.armed_timers(), 0);
    assert_eq!(registry.session_count(), 0);

    settle().await;
    advance(30.0).await;
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_history_select_back_close_reopen() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let source = Arc::new(FakeBuildSource::new(vec![
        build_info(2, "run-2", "running"),
        build_info(1, "run-1", "succeeded"),
    ]));
    let mut browser = history(&registry, &source);

    assert_eq!(browser.open().await.len(), 2);
    assert_eq!(browser.view(), &HistoryView::List);

    browser.select(2).unwrap();
    assert!(matches!(browser.view(), HistoryView::Detail(record) if record.id == 2));
    assert!(browser.is_live());
    settle().await;
    assert_eq!(
        fetcher.requested(),
        vec![BuildRef::new(ProjectRef::Name("shop".to_string()), "run-2")]
    );
    assert_eq!(browser.rendered_logs(), steps(1));

    browser.back();
    assert_eq!(browser.view(), &HistoryView::List);
    assert_eq!(browser.rendered_logs(), "");
    assert_eq!(registry.armed_timers(), 0);

    browser.close();
    assert_eq!(browser.view(), &HistoryView::Closed);
    assert!(browser.builds().is_empty());
    assert!(matches!(
        browser.select(1),
        Err(DashboardError::SessionMisuse(_))
    ));

    browser.open().await;
    assert_eq!(source.list_calls(), 2);
    assert_eq!(browser.builds().len(), 2);

    advance(30.0).await;
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_history_reselect_fetches_again() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let source = Arc::new(FakeBuildSource::new(vec![build_info(5, "run-5", "Failed")]));
    let mut browser = history(&registry, &source);
    browser.open().await;

    browser.select(5).unwrap();
    assert!(!browser.is_live());
    settle().await;
    assert!(browser.is_settled());
    assert_eq!(fetcher.calls(), 1);

    browser.close();
    browser.open().await;
    browser.select(5).unwrap();
    assert!(!browser.is_settled());
    settle().await;

    assert_eq!(fetcher.calls(), 2);
    assert!(browser.is_settled());
    assert_eq!(registry.armed_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_history_listing_drives_final_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let source = Arc::new(FakeBuildSource::new(vec![build_info(3, "run-3", "building")]));
    let mut browser = history(&registry, &source);
    browser.open().await;

    browser.select(3).unwrap();
    settle().await;
    advance(3.0).await;
    assert_eq!(fetcher.calls(), 2);

    source.set_builds(vec![
        build_info(4, "run-4", "new"),
        build_info(3, "run-3", "success"),
    ]);
    browser.refresh().await.unwrap();
    assert!(matches!(browser.view(), HistoryView::Detail(record) if record.raw_status == "success"));
    assert!(!browser.is_live());
    assert_eq!(browser.builds().len(), 2);

    settle().await;
    assert!(browser.is_settled());
    advance(30.0).await;
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_history_list_error() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let source = Arc::new(FakeBuildSource::new(vec![build_info(1, "run-1", "failed")]));
    source.set_failing(true);
    let mut browser = history(&registry, &source);

    assert!(browser.open().await.is_empty());
    assert_eq!(browser.list_error(), Some(LIST_ERROR_MESSAGE));
    assert!(matches!(browser.select(1), Err(DashboardError::NotFound(_))));

    source.set_failing(false);
    browser.open().await;
    assert!(browser.list_error().is_none());
    assert_eq!(browser.builds().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_surfaces_hold_separate_sessions() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let source = Arc::new(FakeBuildSource::new(vec![build_info(9, "run-9", "running")]));

    let mut viewer = InlineViewer::new(registry.clone());
    viewer.show_project(&project(Some("run-9"), "running")).unwrap();
    let mut browser = history(&registry, &source);
    browser.open().await;
    browser.select(9).unwrap();

    assert_ne!(viewer.surface(), browser.surface());
    assert_eq!(registry.armed_timers(), 2);

    drop(browser);
    assert_eq!(registry.armed_timers(), 1);
    assert!(viewer.is_live());

    registry.release_all();
    assert_eq!(registry.armed_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_inline_rebinds_after_session_lost() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let mut viewer = InlineViewer::new(registry.clone());

    viewer.show_project(&project(Some("run-42"), "running")).unwrap();
    settle().await;
    assert!(registry.release(viewer.surface()));

    // Same build, but the registry no longer holds a session for it
    let logs_rx = viewer.show_project(&project(Some("run-42"), "running")).unwrap();
    assert!(logs_rx.is_some());
    assert!(viewer.is_live());
    assert_eq!(registry.session_count(), 1);

    settle().await;
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_history_listing_ignores_status_spelling() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let registry = registry(&fetcher);
    let source = Arc::new(FakeBuildSource::new(vec![build_info(3, "run-3", "succeeded")]));
    let mut browser = history(&registry, &source);
    browser.open().await;

    browser.select(3).unwrap();
    settle().await;
    assert!(browser.is_settled());

    // Same lifecycle state spelled differently: nothing to re-evaluate
    source.set_builds(vec![build_info(3, "run-3", "Success")]);
    browser.refresh().await.unwrap();
    source.set_builds(vec![build_info(3, "run-3", " SUCCEEDED ")]);
    browser.refresh().await.unwrap();
    settle().await;

    assert!(matches!(browser.view(), HistoryView::Detail(record) if record.raw_status == " SUCCEEDED "));
    assert_eq!(fetcher.calls(), 1);
    assert!(browser.is_settled());
}
