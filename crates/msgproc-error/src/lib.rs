use axum::{http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Boxed single cause carried by the pipeline errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ============================================================================
// Pipeline errors
// ============================================================================

/// Connectivity or query failure in the storage adapter.
///
/// `op` names the storage operation that failed; retry policy belongs to the
/// caller.
#[derive(Error, Debug)]
#[error("{op}: {source}")]
pub struct StorageError {
    pub op: &'static str,
    #[source]
    pub source: BoxError,
}

impl StorageError {
    pub fn new(op: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            op,
            source: source.into(),
        }
    }

    /// The targeted row does not exist
    pub fn not_found(op: &'static str, message_id: i64) -> Self {
        Self::new(op, format!("message {} not found", message_id))
    }
}

/// Failure to hand an envelope to the broker
#[derive(Error, Debug)]
pub enum PublishError {
    /// Cancellation fired before the record was handed to the client; nothing
    /// was sent
    #[error("{op}: cancelled before send")]
    Cancelled { op: &'static str },

    /// Cancellation fired while waiting for acknowledgment. The record is
    /// already queued in the client and may still be placed and consumed.
    #[error("{op}: message {message_id} abandoned while awaiting broker acknowledgment")]
    Abandoned { op: &'static str, message_id: i64 },

    #[error("{op}: failed to encode envelope: {source}")]
    Encode {
        op: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{op}: broker rejected message: {source}")]
    Broker {
        op: &'static str,
        #[source]
        source: BoxError,
    },
}

impl PublishError {
    /// Cancelled before anything was sent
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PublishError::Cancelled { .. })
    }

    /// Cancelled after the record was queued; placement is unknown
    pub fn is_abandoned(&self) -> bool {
        matches!(self, PublishError::Abandoned { .. })
    }
}

/// Malformed envelope on the consume side
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("envelope payload is empty")]
    EmptyPayload,

    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid envelope: {0}")]
    Invalid(String),
}

/// Storage failure while reconciling a consumed message
#[derive(Error, Debug)]
#[error("update of message {message_id} failed: {source}")]
pub struct UpdateError {
    pub message_id: i64,
    #[source]
    pub source: StorageError,
}

// ============================================================================
// Application (HTTP-facing) error
// ============================================================================

/// Application error returned by request handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Publish(e) if e.is_cancelled() || e.is_abandoned() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Storage(_) | AppError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => format!("Validation error: {}", msg),
            AppError::NotFound(msg) => format!("Not found: {}", msg),
            AppError::Storage(_) => "Storage error".to_string(),
            AppError::Publish(e) if e.is_cancelled() => "Service is shutting down".to_string(),
            AppError::Publish(PublishError::Abandoned { message_id, .. }) => format!(
                "Service is shutting down; message {} was queued and may still be processed",
                message_id
            ),
            AppError::Publish(_) => "Message queue error".to_string(),
        }
    }

    /// Get error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::Publish(e) if e.is_cancelled() => "CANCELLED",
            AppError::Publish(e) if e.is_abandoned() => "PUBLISH_ABANDONED",
            AppError::Publish(_) => "PUBLISH_ERROR",
        }
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = %code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = %code,
                "Client error occurred"
            );
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let response_body = json!({
            "status": "Error",
            "error": self.user_message(),
            "error_code": self.error_code(),
        });

        (status, axum::Json(response_body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_storage_error_keeps_op_and_cause() {
        let err = StorageError::new("storage.postgres.save", "connection refused");
        assert_eq!(err.to_string(), "storage.postgres.save: connection refused");
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("connection refused".to_string())
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::validation("empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(StorageError::new("op", "down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(PublishError::Cancelled { op: "send" }).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(PublishError::Broker {
                op: "send",
                source: "broker down".into()
            })
            .error_code(),
            "PUBLISH_ERROR"
        );
    }

    #[test]
    fn test_abandoned_publish_is_distinct_from_cancelled() {
        let err = AppError::from(PublishError::Abandoned {
            op: "send",
            message_id: 7,
        });

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "PUBLISH_ABANDONED");
        // the caller learns which row to look up instead of resubmitting
        assert!(err.user_message().contains("message 7"));
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::from(StorageError::new("op", "password authentication failed"));
        assert!(!err.user_message().contains("password"));
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = AppError::validation("msg is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "Error");
        assert_eq!(body["error_code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "Validation error: msg is required");
    }
}
