//! Prometheus metrics for msgproc
//!
//! Covers the two halves of the pipeline:
//! - Ingest (HTTP accept + Kafka produce)
//! - Consume (envelope outcomes)

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder, opts, register_histogram,
    register_int_counter, register_int_counter_vec,
};

// ============================================================================
// Ingest Metrics
// ============================================================================

/// Messages accepted by the ingest endpoint (saved and published)
pub static MESSAGES_INGESTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "msgproc_messages_ingested_total",
        "Total number of messages saved and published"
    ))
    .expect("Failed to register MESSAGES_INGESTED_TOTAL metric")
});

/// Ingest requests rejected, by reason (validation, storage, publish, cancelled)
pub static INGEST_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "msgproc_ingest_failures_total",
            "Ingest requests that did not produce a published message"
        ),
        &["reason"]
    )
    .expect("Failed to register INGEST_FAILURES metric")
});

// ============================================================================
// Kafka Producer Metrics
// ============================================================================

pub static KAFKA_PRODUCE_SUCCESS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "msgproc_kafka_produce_success_total",
        "Total number of successful Kafka produce operations"
    ))
    .expect("Failed to register KAFKA_PRODUCE_SUCCESS metric")
});

pub static KAFKA_PRODUCE_FAILURE: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "msgproc_kafka_produce_failure_total",
        "Total number of failed Kafka produce operations"
    ))
    .expect("Failed to register KAFKA_PRODUCE_FAILURE metric")
});

/// Time from send to broker acknowledgment
pub static KAFKA_PRODUCE_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "msgproc_kafka_produce_latency_seconds",
        "Kafka produce operation latency in seconds",
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register KAFKA_PRODUCE_LATENCY metric")
});

// ============================================================================
// Consumer Metrics
// ============================================================================

/// Consumed envelopes by outcome (completed, failed, undecodable, unresolved)
pub static CONSUMER_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!(
            "msgproc_consumer_outcomes_total",
            "Consumed envelopes by processing outcome"
        ),
        &["outcome"]
    )
    .expect("Failed to register CONSUMER_OUTCOMES metric")
});

pub static KAFKA_CONSUME_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "msgproc_kafka_consume_errors_total",
        "Errors returned by the Kafka consumer (receive or commit)"
    ))
    .expect("Failed to register KAFKA_CONSUME_ERRORS metric")
});

// ============================================================================
// Metrics Collection
// ============================================================================

/// Gather all registered metrics and encode as Prometheus text format
pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_metrics() {
        MESSAGES_INGESTED_TOTAL.inc();
        CONSUMER_OUTCOMES.with_label_values(&["completed"]).inc();

        let metrics_text = gather_metrics().unwrap();
        assert!(metrics_text.contains("msgproc_messages_ingested_total"));
        assert!(metrics_text.contains("msgproc_consumer_outcomes_total"));
    }
}
