//! Route Configuration
//!
//! Configures all HTTP and WebSocket routes of the hub.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, metrics_middleware};
use crate::presentation::websocket::{collab_ws_handler, ws_handler};
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        // WebSocket endpoints authenticate during the upgrade
        .route("/ws", get(ws_handler))
        .route("/ws/collab/{document_id}", get(collab_ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// Query routes (all protected)
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/voice", voice_routes())
        .nest("/collab", collab_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Voice roster routes
fn voice_routes() -> Router<AppState> {
    Router::new().route(
        "/channels/{channel_id}/participants",
        get(handlers::voice::get_participants),
    )
}

/// Collaboration routes
fn collab_routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(handlers::collaboration::sync_update))
        .route(
            "/{document_id}/participants",
            get(handlers::collaboration::get_participants),
        )
        .route(
            "/{document_id}/cursor",
            post(handlers::collaboration::update_cursor),
        )
        .route(
            "/{document_id}/versions",
            get(handlers::collaboration::list_versions),
        )
}
