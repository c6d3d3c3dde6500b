use anyhow::{Context, Result};
use msgproc_config::KafkaConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::BorrowedMessage;
use rdkafka::{Message, Offset};
use std::time::Duration;
use tracing::{info, warn};

use super::config::create_client_config;

/// Kafka consumer for the processing worker
///
/// This consumer is configured for:
/// - Manual offset commits (after the stored row reaches a terminal status)
/// - Consumer group coordination (several processes share the topic)
/// - Auto-rebalancing on worker addition/removal
///
/// Lifecycle: `subscribe`, then `recv`/`commit`/`rewind` in a loop, then
/// `unsubscribe`.
pub struct MessageConsumer {
    consumer: StreamConsumer,
    topic: String,
    group: String,
}

impl MessageConsumer {
    /// Create a new Kafka consumer from the application configuration.
    ///
    /// # Configuration
    /// - `enable.auto.commit=false`: Manual offset management.
    /// - `auto.offset.reset=earliest`: Read from beginning on first start.
    /// - `session.timeout.ms=30000`: 30s session timeout.
    /// - `heartbeat.interval.ms=3000`: 3s heartbeat interval.
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        info!("Initializing Kafka consumer...");
        let mut client_config = create_client_config(config)?;

        let consumer: StreamConsumer = client_config
            .set("group.id", &config.consumer_group)
            // Offset management
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            // Allow broker to auto-create topic on first subscription
            .set("allow.auto.create.topics", "true")
            // Performance
            .set("fetch.min.bytes", "1")
            .set("fetch.wait.max.ms", "500")
            .set("max.partition.fetch.bytes", "1048576") // 1MB
            // Session management
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "3000")
            .set("max.poll.interval.ms", "300000") // 5min max processing time
            .create()
            .context("Failed to create Kafka consumer")?;

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
            group: config.consumer_group.clone(),
        })
    }

    /// Join the consumer group on the relay topic
    pub fn subscribe(&self) -> Result<()> {
        self.consumer
            .subscribe(&[&self.topic])
            .context("Failed to subscribe to Kafka topic")?;

        info!(
            "Kafka consumer subscribed to topic '{}' in group '{}'",
            self.topic, self.group
        );
        Ok(())
    }

    /// Leave the consumer group
    pub fn unsubscribe(&self) {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, group = %self.group, "Kafka consumer left group");
    }

    /// Wait for the next record
    pub async fn recv(&self) -> KafkaResult<BorrowedMessage<'_>> {
        self.consumer.recv().await
    }

    /// Commit the offset following `message`
    pub fn commit(&self, message: &BorrowedMessage<'_>) -> KafkaResult<()> {
        self.consumer.commit_message(message, CommitMode::Sync)
    }

    /// Reposition a partition so the record at `offset` is delivered again
    pub fn rewind(&self, partition: i32, offset: i64) -> KafkaResult<()> {
        warn!(
            topic = %self.topic,
            partition = partition,
            offset = offset,
            "Rewinding partition for redelivery"
        );
        self.consumer.seek(
            &self.topic,
            partition,
            Offset::Offset(offset),
            Duration::from_secs(5),
        )
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Partition and offset of a consumed record, for logging
pub fn position(message: &BorrowedMessage<'_>) -> (i32, i64) {
    (message.partition(), message.offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consumer_creation_does_not_connect() {
        let config = KafkaConfig {
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
        };

        let consumer = MessageConsumer::new(&config).unwrap();
        assert_eq!(consumer.topic(), "msgproc-test");
    }
}
