// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Router assembly and middleware
// - messages.rs: Ingest and status lookup
// - stats.rs: Aggregate statistics
// - health.rs: Health check and metrics endpoints
//
// ============================================================================

mod health;
mod messages;
mod stats;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use msgproc_config::{HttpConfig, MAX_REQUEST_BODY_SIZE};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>, http: &HttpConfig) -> Router {
    let bounded = Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Read API
        .route("/api/v1/msg/{id}", get(messages::get_message))
        .route("/api/v1/stat", get(stats::get_statistics))
        .route_layer(TimeoutLayer::new(http.request_timeout()));

    Router::new()
        // Ingest is bounded by the producer delivery timeout and the drain
        // deadline. Dropping it earlier would orphan a queued record.
        .route("/api/v1/msg", post(messages::create_message))
        .merge(bounded)
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
                .into_inner(),
        )
        .with_state(app_context)
}
