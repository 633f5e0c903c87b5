//! Web application router and middleware setup.

use crate::web::config::WebConfig;
use crate::web::{handlers, AppState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the axum application with all routes and middleware.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", get(handlers::default_index))
        .route("/metrics", get(handlers::metrics))
        .route("/api/health", get(handlers::health_check));

    if config.enable_status_api {
        app = app.route("/api/status", get(handlers::get_status));
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
