//! HTTP handlers for the exporter endpoints.

use crate::scrape::status::StatusSnapshot;
use crate::web::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use tracing::error;

/// Current metric set in the Prometheus text exposition format.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Latest status snapshot as JSON.
pub async fn get_status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    let status = state.status.read().await;
    Json(status.snapshot())
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let last_scrape = state.status.read().await.last_scrape();
    Json(json!({
        "status": "ok",
        "service": "arris-exporter",
        "version": env!("CARGO_PKG_VERSION"),
        "last_scrape": last_scrape.map(|t| t.to_rfc3339()),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Landing page pointing at the endpoints.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>ARRIS Exporter</title></head>
<body>
<h1>ARRIS Exporter</h1>
<ul>
<li><a href="/metrics">/metrics</a> - Prometheus metrics</li>
<li><a href="/api/status">/api/status</a> - latest modem status</li>
<li><a href="/api/health">/api/health</a> - health check</li>
</ul>
</body>
</html>
"#;
