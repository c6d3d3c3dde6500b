// ============================================================================
// Ingest Service
// ============================================================================
//
// Synchronous ingest path: validate -> Save (pending row) -> publish envelope.
// The returned id always refers to a committed row; when the publish fails
// after Save, that row stays `pending`.
//
// ============================================================================

use msgproc_config::MAX_CONTENT_SIZE;
use msgproc_db::MessageStore;
use msgproc_error::{AppError, AppResult};
use msgproc_metrics as metrics;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::kafka::{EnvelopePublisher, MessageEnvelope};

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    publisher: Arc<dyn EnvelopePublisher>,
}

impl MessageService {
    pub fn new(store: Arc<dyn MessageStore>, publisher: Arc<dyn EnvelopePublisher>) -> Self {
        Self { store, publisher }
    }

    /// Persist `content` and hand it to the relay topic.
    ///
    /// Returns the id of the new `pending` row once the broker has
    /// acknowledged the envelope.
    pub async fn process_message(
        &self,
        content: &str,
        cancel: &CancellationToken,
    ) -> AppResult<i64> {
        if let Err(e) = validate_content(content) {
            metrics::INGEST_FAILURES
                .with_label_values(&["validation"])
                .inc();
            return Err(e);
        }

        let message_id = match self.store.save(content).await {
            Ok(id) => id,
            Err(e) => {
                metrics::INGEST_FAILURES.with_label_values(&["storage"]).inc();
                return Err(e.into());
            }
        };

        let envelope = MessageEnvelope::new(message_id, content);
        let placement = match self.publisher.publish(&envelope, cancel).await {
            Ok(placement) => placement,
            Err(e) => {
                let reason = if e.is_cancelled() {
                    "cancelled"
                } else if e.is_abandoned() {
                    "abandoned"
                } else {
                    "publish"
                };
                metrics::INGEST_FAILURES.with_label_values(&[reason]).inc();
                warn!(
                    message_id,
                    error = %e,
                    "Publish failed after save, message stays pending"
                );
                return Err(e.into());
            }
        };

        metrics::MESSAGES_INGESTED_TOTAL.inc();
        info!(
            message_id,
            partition = placement.partition,
            offset = placement.offset,
            "Message accepted"
        );

        Ok(message_id)
    }
}

/// Content must be non-empty and at most `MAX_CONTENT_SIZE` bytes
fn validate_content(content: &str) -> AppResult<()> {
    if content.is_empty() {
        return Err(AppError::validation("msg must not be empty"));
    }
    if content.len() > MAX_CONTENT_SIZE {
        return Err(AppError::validation(format!(
            "msg exceeds {} bytes",
            MAX_CONTENT_SIZE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hello").is_ok());
        // whitespace is accepted and trimmed by the consumer
        assert!(validate_content("   ").is_ok());
        assert!(matches!(
            validate_content(""),
            Err(AppError::Validation(_))
        ));
        assert!(validate_content(&"a".repeat(MAX_CONTENT_SIZE)).is_ok());
        assert!(matches!(
            validate_content(&"a".repeat(MAX_CONTENT_SIZE + 1)),
            Err(AppError::Validation(_))
        ));
    }
}
