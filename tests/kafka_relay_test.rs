// ============================================================================
// Kafka Relay Tests
// ============================================================================
//
// Exercise the real producer, consumer and claim loop against a broker.
// The store is in-memory so only Kafka is required.
//
// Run with: KAFKA_BROKERS=localhost:9092 cargo test --test kafka_relay_test -- --ignored
//
// ============================================================================

use msgproc::ingest::MessageService;
use msgproc::kafka::{MessageConsumer, MessageProducer};
use msgproc::processor::MessageProcessor;
use msgproc::worker::run_consumer;
use msgproc_config::KafkaConfig;
use msgproc_db::{Fault, InMemoryMessageStore, MessageStatus, MessageStore};
use serial_test::serial;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

fn kafka_config() -> KafkaConfig {
    // Fresh topic and group per run so earlier runs do not interfere
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis();

    KafkaConfig {
        brokers: std::env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".to_string()),
        topic: format!("msgproc-test-{}", suffix),
        consumer_group: format!("msgproc-test-{}", suffix),
        ssl_enabled: false,
        sasl_mechanism: None,
        sasl_username: None,
        sasl_password: None,
        ssl_ca_location: None,
        producer_compression: "none".to_string(),
        producer_acks: "all".to_string(),
        producer_linger_ms: 0,
        producer_request_timeout_ms: 30000,
        producer_delivery_timeout_ms: 60000,
        producer_enable_idempotence: true,
        send_timeout_ms: 5000,
        retry_backoff_ms: 100,
    }
}

async fn wait_for_status(
    store: &InMemoryMessageStore,
    id: i64,
    expected: MessageStatus,
) -> bool {
    for _ in 0..300 {
        if let Ok(Some(row)) = store.find(id).await {
            if row.status == expected {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
#[ignore] // Requires Kafka
#[serial]
async fn test_ingested_message_is_completed_by_consumer() {
    let config = kafka_config();
    let store = Arc::new(InMemoryMessageStore::new());
    let producer = MessageProducer::new(&config).unwrap();
    let consumer = MessageConsumer::new(&config).unwrap();
    let shutdown = CancellationToken::new();

    let worker = tokio::spawn(run_consumer(
        consumer,
        MessageProcessor::new(store.clone()),
        Duration::from_millis(config.retry_backoff_ms),
        shutdown.clone(),
    ));

    let service = MessageService::new(store.clone(), Arc::new(producer.clone()));
    let id = service
        .process_message("  hello  ", &CancellationToken::new())
        .await
        .unwrap();

    assert!(wait_for_status(&store, id, MessageStatus::Completed).await);
    assert_eq!(store.find(id).await.unwrap().unwrap().content, "hello");

    shutdown.cancel();
    worker.await.unwrap().unwrap();
    producer.flush(Duration::from_secs(5)).unwrap();
}

#[tokio::test]
#[ignore] // Requires Kafka
#[serial]
async fn test_unresolved_record_is_redelivered() {
    let config = kafka_config();
    let store = Arc::new(InMemoryMessageStore::new());
    let producer = MessageProducer::new(&config).unwrap();
    let consumer = MessageConsumer::new(&config).unwrap();
    let shutdown = CancellationToken::new();

    let service = MessageService::new(store.clone(), Arc::new(producer.clone()));
    let id = service
        .process_message("retry me", &CancellationToken::new())
        .await
        .unwrap();
    store.fail_times(Fault::UpdateStatus(id), 2).await;

    let worker = tokio::spawn(run_consumer(
        consumer,
        MessageProcessor::new(store.clone()),
        Duration::from_millis(config.retry_backoff_ms),
        shutdown.clone(),
    ));

    assert!(wait_for_status(&store, id, MessageStatus::Completed).await);

    shutdown.cancel();
    worker.await.unwrap().unwrap();
}
