//! Web server exposing the exporter's metrics and status.
//!
//! `/metrics` serves the Prometheus text format, `/api/status` the latest
//! status snapshot as JSON and `/api/health` a liveness probe.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{ExporterError, Result};
use crate::metrics::lifecycle::ChannelMetrics;
use crate::poll::SharedStatus;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub status: SharedStatus,
    pub metrics: Arc<ChannelMetrics>,
}

impl AppState {
    pub fn new(status: SharedStatus, metrics: Arc<ChannelMetrics>) -> Self {
        Self { status, metrics }
    }
}

/// Start the web server and run until `shutdown` is cancelled.
pub async fn start_web_server(
    config: WebConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<()> {
    let app = create_app(&config, state);

    let addr = config.socket_addr()?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Starting ARRIS exporter on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| ExporterError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
