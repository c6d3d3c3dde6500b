// Kafka module for the message relay topic
//
// The ingest path publishes one envelope per saved message; the in-process
// consumer reads them back and finalizes the stored row.

pub mod config;
pub mod consumer;
pub mod producer;
pub mod types;

// Re-export commonly used types
pub use consumer::MessageConsumer;
pub use producer::{EnvelopePublisher, MessageProducer};
pub use types::{MessageEnvelope, Placement};
