// ============================================================================
// Envelope Processor
// ============================================================================
//
// Reconciles a consumed envelope with its stored row:
// decode -> trim -> update content -> record terminal status.
//
// The returned ProcessResult decides whether the consumer commits the offset.
//
// ============================================================================

use msgproc_db::{MessageStatus, MessageStore};
use msgproc_error::{DecodeError, UpdateError};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::kafka::MessageEnvelope;

/// Outcome of processing one envelope.
///
/// Only `Completed` and `Failed` commit the offset.
#[derive(Debug)]
pub enum ProcessResult {
    /// Content rewritten and status `completed` recorded - COMMIT offset
    Completed { message_id: i64 },
    /// Content update failed, status `failed` recorded - COMMIT offset
    Failed { message_id: i64 },
    /// Envelope could not be decoded - skipped, offset NOT committed
    Undecodable(DecodeError),
    /// Status write failed - offset NOT committed, envelope must be redelivered
    Unresolved(UpdateError),
}

impl ProcessResult {
    pub fn should_commit(&self) -> bool {
        matches!(
            self,
            ProcessResult::Completed { .. } | ProcessResult::Failed { .. }
        )
    }

    /// Label for the outcome metric
    pub fn outcome(&self) -> &'static str {
        match self {
            ProcessResult::Completed { .. } => "completed",
            ProcessResult::Failed { .. } => "failed",
            ProcessResult::Undecodable(_) => "undecodable",
            ProcessResult::Unresolved(_) => "unresolved",
        }
    }
}

#[derive(Clone)]
pub struct MessageProcessor {
    store: Arc<dyn MessageStore>,
}

impl MessageProcessor {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Process a raw record payload.
    ///
    /// Replaying the same payload converges on the same row state.
    pub async fn process(&self, payload: Option<&[u8]>) -> ProcessResult {
        let envelope = match MessageEnvelope::decode(payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable envelope");
                return ProcessResult::Undecodable(e);
            }
        };

        let message_id = envelope.id;
        let normalized = envelope.content.trim();

        let status = match self.store.update_content(message_id, normalized).await {
            Ok(()) => MessageStatus::Completed,
            Err(source) => {
                let err = UpdateError { message_id, source };
                warn!(error = %err, message_id, "Content update failed, recording failed status");
                MessageStatus::Failed
            }
        };

        if let Err(source) = self.store.update_status(message_id, status).await {
            let err = UpdateError { message_id, source };
            error!(
                error = %err,
                message_id,
                status = %status,
                "Status update failed, envelope left unacknowledged"
            );
            return ProcessResult::Unresolved(err);
        }

        debug!(message_id, status = %status, "Envelope processed");

        match status {
            MessageStatus::Completed => ProcessResult::Completed { message_id },
            _ => ProcessResult::Failed { message_id },
        }
    }
}
