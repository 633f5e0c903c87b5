//! # ARRIS Exporter - Cable Modem Channel Metrics
//!
//! Polls the connection status page of an ARRIS SURFboard cable modem,
//! extracts the startup procedure and bonded channel tables, and exposes
//! per-channel readings as Prometheus gauges.
//!
//! ## Features
//!
//! - **Extraction pipeline**: an ordered chain of steps run against each page
//! - **Channel tracking**: gauges follow channels as they appear and vanish
//! - **Live gauges**: values are read from the latest scrape at sample time
//! - **Web endpoints**: `/metrics`, `/api/status` and `/api/health`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arris_exporter::{
//!     ChannelMetrics, HttpFetcher, Poller, Status, WebConfig, start_web_server,
//!     web::AppState,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::sync::RwLock;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let metrics = Arc::new(ChannelMetrics::default());
//!     let status = Arc::new(RwLock::new(Status::new(metrics.clone())));
//!
//!     let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(10))?);
//!     let poller = Poller::new(status.clone(), fetcher, Duration::from_secs(15)).spawn();
//!
//!     let state = AppState::new(status, metrics);
//!     start_web_server(WebConfig::default(), state, CancellationToken::new()).await?;
//!     poller.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod metrics;
pub mod poll;
pub mod scrape;
pub mod web;

// Re-export public API
pub use error::{ExporterError, Result};
pub use metrics::{ChannelDiff, ChannelMetrics, SyncOutcome};
pub use poll::{HttpFetcher, ModemConfig, PageFetcher, PollStats, Poller, PollerHandle, SharedStatus};
pub use scrape::{
    DownstreamChannel, Extractor, ExtractorChain, Page, ScrapeReport, Status, StatusSnapshot,
    UpstreamChannel,
};
pub use web::{start_web_server, WebConfig};

/// The default modem polling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 15_000;

/// The default modem request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// The default metrics server port
pub const DEFAULT_WEB_PORT: u16 = 9393;
