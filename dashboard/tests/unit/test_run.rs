//! Command runner tests against a local backend

mod support;

use std::time::Duration;

use kautodash::app::options::AppOptions;
use kautodash::app::run::{run, Command};
use kautodash::errors::DashboardError;
use tokio::time::{sleep, timeout, Instant};

use support::{local_backend, Route};

fn options(base_url: &str) -> AppOptions {
    AppOptions {
        backend_base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn projects(status: &str) -> String {
    format!(
        r#"[{{"id":7,"name":"shop","git_url":"https://github.com/acme/shop.git","framework":"react","last_build_status":"{}","last_pipeline_run_name":"run-42"}}]"#,
        status
    )
}

#[tokio::test]
async fn test_shutdown_during_startup_stops_follow() {
    let backend = local_backend(vec![
        Route::ok("/projects", projects("New")).delayed(Duration::from_millis(300)),
    ])
    .await;

    let started = Instant::now();
    let result = timeout(
        Duration::from_secs(3),
        run(
            Command::Logs { project_id: 7 },
            options(&backend.base_url),
            sleep(Duration::from_millis(50)),
        ),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
    assert!(started.elapsed() < Duration::from_millis(300));
}

#[tokio::test]
async fn test_shutdown_while_following_unsettled_build() {
    let backend = local_backend(vec![Route::ok("/projects", projects("New"))]).await;

    let result = timeout(
        Duration::from_secs(3),
        run(
            Command::Logs { project_id: 7 },
            options(&backend.base_url),
            sleep(Duration::from_millis(200)),
        ),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}

#[tokio::test]
async fn test_history_follow_stops_on_shutdown() {
    let backend = local_backend(vec![
        Route::ok("/projects", projects("running")),
        Route::ok(
            "/projects/7/builds",
            r#"[{"id":3,"pipeline_run_name":"run-42","status":"running","start_time":"2024-05-01T12:00:00Z"}]"#,
        ),
        Route::ok("/builds/shop/run-42/logs", r#"{"logs":"cloning\n"}"#),
    ])
    .await;

    let result = timeout(
        Duration::from_secs(3),
        run(
            Command::History {
                project_id: 7,
                build_id: Some(3),
            },
            options(&backend.base_url),
            sleep(Duration::from_millis(200)),
        ),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}

#[tokio::test]
async fn test_follow_ends_when_build_is_finished() {
    let backend = local_backend(vec![
        Route::ok("/projects", projects("succeeded")),
        Route::ok("/builds/run-42/logs", r#"{"logs":"done\n"}"#),
    ])
    .await;

    let result = timeout(
        Duration::from_secs(3),
        run(
            Command::Logs { project_id: 7 },
            options(&backend.base_url),
            std::future::pending(),
        ),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}

#[tokio::test]
async fn test_backend_error_is_returned() {
    let backend = local_backend(vec![
        Route::ok("/projects", r#"{"detail":"boom"}"#).status(500),
    ])
    .await;

    let result = run(
        Command::Projects,
        options(&backend.base_url),
        std::future::pending(),
    )
    .await;

    assert!(matches!(
        result,
        Err(DashboardError::Api { status: 500, ref body }) if body == "boom"
    ));
}
