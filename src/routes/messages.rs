// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST /api/v1/msg - Ingest a message, returns its id
// - GET /api/v1/msg/{id} - Look up a stored message
//
// ============================================================================

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use msgproc_error::AppError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub msg: String,
}

/// POST /api/v1/msg
pub async fn create_message(
    State(app_context): State<Arc<AppContext>>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let message_id = app_context
        .messages
        .process_message(&request.msg, &app_context.request_cancel)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "msg_id": message_id,
        })),
    ))
}

/// GET /api/v1/msg/{id}
pub async fn get_message(
    State(app_context): State<Arc<AppContext>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id.map_err(|e| AppError::validation(e.body_text()))?;

    let message = app_context
        .store
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("message {}", id)))?;

    Ok(Json(json!({
        "status": "OK",
        "message": message,
    })))
}
