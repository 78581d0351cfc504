//! Status feed worker
//!
//! Surfaces only learn about status changes when their status input is
//! re-fetched. This worker re-fetches on a fixed interval and hands every
//! successful result to the surface's owner through a channel.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::DashboardError;

/// Feed worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Refresh interval
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Run the feed worker until shutdown or until the receiver goes away
pub async fn run<T, P, PF, S, F>(
    options: &Options,
    name: &str,
    fetch: P,
    feed_tx: mpsc::Sender<T>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    P: Fn() -> PF,
    PF: Future<Output = Result<T, DashboardError>>,
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("{} feed starting...", name);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("{} feed shutting down...", name);
                return;
            }
            _ = sleep_fn(options.interval) => {
                // Continue with refresh
            }
        }

        debug!("Refreshing {}...", name);

        match fetch().await {
            Ok(value) => {
                if feed_tx.send(value).await.is_err() {
                    debug!("{} feed receiver dropped, stopping", name);
                    return;
                }
            }
            Err(e) => {
                // Will retry on next interval
                error!("{} refresh failed: {}", name, e);
            }
        }
    }
}
