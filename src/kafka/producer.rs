use anyhow::{Context, Result};
use msgproc_config::KafkaConfig;
use msgproc_error::PublishError;
use msgproc_metrics as metrics;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::create_client_config;
use super::types::{MessageEnvelope, Placement};

/// Publishes envelopes and waits for broker placement.
///
/// The ingest path depends on this trait rather than on rdkafka so tests can
/// substitute a recording publisher.
#[async_trait::async_trait]
pub trait EnvelopePublisher: Send + Sync {
    /// Publish one envelope and wait until the broker acknowledges it.
    ///
    /// Fails with `PublishError::Cancelled` without touching the network when
    /// `cancel` has already fired. If it fires later the wait is abandoned with
    /// `PublishError::Abandoned`; the record may still reach the topic.
    async fn publish(
        &self,
        envelope: &MessageEnvelope,
        cancel: &CancellationToken,
    ) -> Result<Placement, PublishError>;
}

/// Kafka producer for the relay topic
///
/// This producer is configured for:
/// - At-least-once delivery (`acks=all`, unbounded librdkafka retries)
/// - Idempotent writes within the producer session
/// - Compression and a small linger window from `KafkaConfig`
pub struct MessageProducer {
    producer: Arc<FutureProducer>,
    topic: String,
    send_timeout: Duration,
}

impl MessageProducer {
    /// Create a new Kafka producer from the application configuration.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        info!("Initializing Kafka producer...");
        let mut client_config = create_client_config(config)?;

        let producer: FutureProducer = client_config
            // Reliability settings
            .set("acks", &config.producer_acks)
            .set(
                "enable.idempotence",
                config.producer_enable_idempotence.to_string(),
            )
            .set("max.in.flight.requests.per.connection", "5")
            .set("retries", "2147483647")
            // Performance settings
            .set("compression.type", &config.producer_compression)
            .set("linger.ms", config.producer_linger_ms.to_string())
            // Timeout settings
            .set(
                "request.timeout.ms",
                config.producer_request_timeout_ms.to_string(),
            )
            .set(
                "delivery.timeout.ms",
                config.producer_delivery_timeout_ms.to_string(),
            )
            .create()
            .context("Failed to create Kafka producer")?;

        info!(
            "Kafka producer initialized successfully for topic '{}'",
            config.topic
        );

        Ok(Self {
            producer: Arc::new(producer),
            topic: config.topic.clone(),
            send_timeout: Duration::from_millis(config.send_timeout_ms),
        })
    }

    /// Flush pending messages (for graceful shutdown)
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        info!("Flushing Kafka producer (timeout: {:?})", timeout);

        self.producer
            .flush(Timeout::After(timeout))
            .context("Failed to flush Kafka producer")?;

        info!("Kafka producer flushed successfully");
        Ok(())
    }
}

#[async_trait::async_trait]
impl EnvelopePublisher for MessageProducer {
    async fn publish(
        &self,
        envelope: &MessageEnvelope,
        cancel: &CancellationToken,
    ) -> Result<Placement, PublishError> {
        const OP: &str = "kafka.producer.send";

        if cancel.is_cancelled() {
            return Err(PublishError::Cancelled { op: OP });
        }

        let payload = envelope
            .encode()
            .map_err(|source| PublishError::Encode { op: OP, source })?;
        let key = envelope.key();

        let record = FutureRecord::to(&self.topic)
            .key(key.as_str())
            .payload(&payload);

        let start = Instant::now();

        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                metrics::KAFKA_PRODUCE_FAILURE.inc();
                warn!(
                    message_id = envelope.id,
                    "Publish abandoned: cancelled while awaiting broker acknowledgment"
                );
                return Err(PublishError::Abandoned {
                    op: OP,
                    message_id: envelope.id,
                });
            }
            delivery = self.producer.send(record, Timeout::After(self.send_timeout)) => delivery,
        };

        match delivery {
            Ok((partition, offset)) => {
                let latency = start.elapsed();

                metrics::KAFKA_PRODUCE_SUCCESS.inc();
                metrics::KAFKA_PRODUCE_LATENCY.observe(latency.as_secs_f64());

                debug!(
                    partition = partition,
                    offset = offset,
                    message_id = envelope.id,
                    latency_ms = latency.as_millis() as u64,
                    "Envelope persisted to Kafka"
                );

                Ok(Placement { partition, offset })
            }
            Err((kafka_err, _)) => {
                metrics::KAFKA_PRODUCE_FAILURE.inc();

                error!(
                    error = %kafka_err,
                    message_id = envelope.id,
                    topic = %self.topic,
                    latency_ms = start.elapsed().as_millis() as u64,
                    "Failed to send envelope to Kafka"
                );

                Err(PublishError::Broker {
                    op: OP,
                    source: Box::new(kafka_err),
                })
            }
        }
    }
}

// Implement Clone manually to avoid cloning the producer (Arc handles it)
impl Clone for MessageProducer {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            topic: self.topic.clone(),
            send_timeout: self.send_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kafka_config() -> KafkaConfig {
        KafkaConfig {
            // Nothing listens here; producer creation does not connect eagerly
            brokers: "127.0.0.1:1".to_string(),
            topic: "msgproc-test".to_string(),
            consumer_group: "msgproc-test".to_string(),
            ssl_enabled: false,
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
            ssl_ca_location: None,
            producer_compression: "none".to_string(),
            producer_acks: "all".to_string(),
            producer_linger_ms: 0,
            producer_request_timeout_ms: 1000,
            producer_delivery_timeout_ms: 2000,
            producer_enable_idempotence: true,
            send_timeout_ms: 100,
            retry_backoff_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_publish_after_cancellation_fails_fast() {
        let producer = MessageProducer::new(&kafka_config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = producer
            .publish(&MessageEnvelope::new(1, "hello"), &cancel)
            .await;

        assert!(matches!(result, Err(PublishError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_cancellation_abandons_pending_acknowledgment() {
        let producer = MessageProducer::new(&kafka_config()).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        // The broker is unreachable, so the acknowledgment can only end by
        // cancellation (after 50ms) or by delivery timeout (after 2s).
        let started = Instant::now();
        let result = producer
            .publish(&MessageEnvelope::new(1, "hello"), &cancel)
            .await;

        assert!(matches!(
            result,
            Err(PublishError::Abandoned { message_id: 1, .. })
        ));
        assert!(started.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    #[ignore] // Requires Kafka
    async fn test_publish_returns_placement() {
        let mut config = kafka_config();
        config.brokers =
            std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string());
        config.send_timeout_ms = 5000;
        config.producer_delivery_timeout_ms = 10000;
        let producer = MessageProducer::new(&config).unwrap();

        let placement = producer
            .publish(&MessageEnvelope::new(1, "hello"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(placement.partition >= 0);
        assert!(placement.offset >= 0);
        producer.flush(Duration::from_secs(5)).unwrap();
    }
}
