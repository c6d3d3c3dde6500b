use std::collections::BTreeMap;

use msgproc_error::StorageError;

use crate::models::{Message, MessageStatus};

/// Storage interface for the message table
///
/// Implementations:
/// - PostgreSQL (`PostgresMessageStore`)
/// - In-memory (`InMemoryMessageStore`) for tests and local runs
///
/// Every operation fails with a `StorageError` tagged with the operation name.
/// Implementations never retry internally.
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a new `pending` row inside a single transaction and return its id
    async fn save(&self, content: &str) -> Result<i64, StorageError>;

    /// Overwrite the content of an existing row.
    ///
    /// Writing the value already stored is a no-op change, not an error.
    async fn update_content(&self, id: i64, content: &str) -> Result<(), StorageError>;

    /// Overwrite the status of a row. Replays of the same status are no-ops.
    async fn update_status(&self, id: i64, status: MessageStatus) -> Result<(), StorageError>;

    /// Look up a single message by id
    async fn find(&self, id: i64) -> Result<Option<Message>, StorageError>;

    // ===== Read aggregates =====

    async fn total(&self) -> Result<i64, StorageError>;

    /// Row counts keyed by status; statuses without rows are absent
    async fn by_status(&self) -> Result<BTreeMap<String, i64>, StorageError>;

    async fn created_last_day(&self) -> Result<i64, StorageError>;

    async fn updated_last_day(&self) -> Result<i64, StorageError>;

    /// Mean content length in characters, `0.0` for an empty table
    async fn average_length(&self) -> Result<f64, StorageError>;

    /// Connectivity check for health endpoints
    async fn ping(&self) -> Result<(), StorageError>;
}
