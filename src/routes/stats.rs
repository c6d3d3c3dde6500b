// ============================================================================
// Statistics Routes
// ============================================================================
//
// Endpoints:
// - GET /api/v1/stat - Aggregate counts over the message table
//
// ============================================================================

use axum::{Json, extract::State, response::IntoResponse};
use msgproc_error::AppError;
use serde::Serialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::stats::StatisticsSnapshot;

#[derive(Serialize)]
struct StatisticsResponse {
    status: &'static str,
    #[serde(flatten)]
    snapshot: StatisticsSnapshot,
}

/// GET /api/v1/stat
pub async fn get_statistics(
    State(app_context): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_context.stats.snapshot().await?;

    Ok(Json(StatisticsResponse {
        status: "OK",
        snapshot,
    }))
}
