// ============================================================================
// Consumer Worker
// ============================================================================
//
// Long-running claim loop: one task, records processed strictly in arrival
// order. Offset is committed ONLY for Completed and Failed results.
//
// ============================================================================

use anyhow::Result;
use msgproc_metrics as metrics;
use rdkafka::Message;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::kafka::MessageConsumer;
use crate::kafka::consumer::position;
use crate::processor::{MessageProcessor, ProcessResult};

/// Run the consumer until `shutdown` fires, then leave the group.
///
/// A record already being processed is finished before the loop exits.
pub async fn run_consumer(
    consumer: MessageConsumer,
    processor: MessageProcessor,
    retry_backoff: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    consumer.subscribe()?;
    info!(topic = %consumer.topic(), "Consumer claim loop started");

    let mut processed: u64 = 0;

    loop {
        let received = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            received = consumer.recv() => received,
        };

        let message = match received {
            Ok(message) => message,
            Err(e) => {
                metrics::KAFKA_CONSUME_ERRORS.inc();
                error!(error = %e, "Kafka consumer error");
                if !backoff(retry_backoff, &shutdown).await {
                    break;
                }
                continue;
            }
        };

        let (partition, offset) = position(&message);
        let result = processor.process(message.payload()).await;
        metrics::CONSUMER_OUTCOMES
            .with_label_values(&[result.outcome()])
            .inc();

        match result {
            ProcessResult::Completed { message_id } | ProcessResult::Failed { message_id } => {
                processed += 1;
                if let Err(e) = consumer.commit(&message) {
                    metrics::KAFKA_CONSUME_ERRORS.inc();
                    error!(
                        error = %e,
                        message_id,
                        partition,
                        offset,
                        "Failed to commit Kafka offset"
                    );
                } else {
                    debug!(message_id, partition, offset, "Kafka offset committed");
                }
            }
            ProcessResult::Undecodable(_) => {
                // Skipped without commit; a later commit on this partition
                // moves past it.
                warn!(partition, offset, "Undecodable record skipped, offset NOT committed");
            }
            ProcessResult::Unresolved(err) => {
                warn!(
                    message_id = err.message_id,
                    partition,
                    offset,
                    "Offset NOT committed, record will be redelivered"
                );
                drop(message);
                if let Err(e) = consumer.rewind(partition, offset) {
                    error!(error = %e, partition, offset, "Failed to rewind partition");
                }
                if !backoff(retry_backoff, &shutdown).await {
                    break;
                }
            }
        }
    }

    consumer.unsubscribe();
    info!(processed, "Consumer stopped");
    Ok(())
}

/// Sleep for `delay`; returns false if shutdown fired first
async fn backoff(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
