//! Periodic fetch → parse → scrape loop.
//!
//! The loop runs as its own task next to the web server. It takes the status
//! write lock only for the synchronous scrape, so metric requests are held up
//! for one table replacement at most.

pub mod config;
pub mod fetch;

pub use config::ModemConfig;
pub use fetch::{HttpFetcher, PageFetcher};

use crate::error::Result;
use crate::scrape::page::ScrapeReport;
use crate::scrape::status::Status;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Status shared between the poll loop and the web handlers.
pub type SharedStatus = Arc<RwLock<Status>>;

/// Counters for a poller's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollStats {
    /// Cycles that fetched and scraped a document
    pub cycles: u64,
    /// Cycles skipped because of a transport or document error
    pub failures: u64,
    /// Scraped cycles in which at least one step failed
    pub partial: u64,
}

/// Drives the status scrape on a fixed interval.
pub struct Poller {
    status: SharedStatus,
    fetcher: Arc<dyn PageFetcher>,
    interval: Duration,
}

impl Poller {
    pub fn new(status: SharedStatus, fetcher: Arc<dyn PageFetcher>, interval: Duration) -> Self {
        Self {
            status,
            fetcher,
            interval,
        }
    }

    /// Run a single fetch and scrape.
    pub async fn poll_once(&self) -> Result<ScrapeReport> {
        let url = self.status.read().await.url();
        let body = self.fetcher.fetch(&url).await?;

        let mut status = self.status.write().await;
        status.scrape_body(&body)
    }

    /// Start the loop on the runtime. The first cycle runs immediately.
    pub fn spawn(self) -> PollerHandle {
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(self.run(shutdown.clone()));
        PollerHandle { shutdown, task }
    }

    async fn run(self, shutdown: CancellationToken) -> PollStats {
        let mut stats = PollStats::default();
        info!(interval_ms = self.interval.as_millis() as u64, "poll loop started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.poll_once() => match result {
                    Ok(report) => {
                        stats.cycles += 1;
                        if report.success() {
                            debug!("scrape complete");
                        } else {
                            stats.partial += 1;
                            warn!(failed = ?report.failed(), "scrape incomplete");
                        }
                    }
                    Err(e) if e.is_transient() => {
                        stats.failures += 1;
                        error!(error = %e, "poll cycle skipped");
                    }
                    Err(e) => {
                        stats.failures += 1;
                        error!(error = %e, "poll cycle failed unexpectedly");
                    }
                },
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(?stats, "poll loop stopped");
        stats
    }
}

/// Handle to a running poll loop.
pub struct PollerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<PollStats>,
}

impl PollerHandle {
    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Interrupt any in-flight fetch or sleep and wait for the loop to exit.
    pub async fn shutdown(self) -> PollStats {
        self.shutdown.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "poll task panicked");
                PollStats::default()
            }
        }
    }
}
