use msgproc_db::MessageStore;
use msgproc_error::StorageError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Point-in-time aggregate view of the message table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_messages: i64,
    pub messages_by_status: BTreeMap<String, i64>,
    pub messages_last_day: i64,
    pub messages_updated_last_day: i64,
    pub average_message_length: f64,
}

/// Builds statistics snapshots from the storage aggregates
#[derive(Clone)]
pub struct StatisticsService {
    store: Arc<dyn MessageStore>,
}

impl StatisticsService {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Run the five aggregates in order; the first failure aborts the snapshot
    pub async fn snapshot(&self) -> Result<StatisticsSnapshot, StorageError> {
        Ok(StatisticsSnapshot {
            total_messages: self.store.total().await?,
            messages_by_status: self.store.by_status().await?,
            messages_last_day: self.store.created_last_day().await?,
            messages_updated_last_day: self.store.updated_last_day().await?,
            average_message_length: self.store.average_length().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgproc_db::{Fault, InMemoryMessageStore, MessageStatus};

    #[tokio::test]
    async fn test_empty_snapshot() {
        let service = StatisticsService::new(Arc::new(InMemoryMessageStore::new()));

        let snapshot = service.snapshot().await.unwrap();

        assert_eq!(snapshot.total_messages, 0);
        assert!(snapshot.messages_by_status.is_empty());
        assert_eq!(snapshot.average_message_length, 0.0);
    }

    #[tokio::test]
    async fn test_snapshot_counts() {
        let store = Arc::new(InMemoryMessageStore::new());
        let id = store.save("hello").await.unwrap();
        store.save("hi").await.unwrap();
        store
            .update_status(id, MessageStatus::Failed)
            .await
            .unwrap();
        let service = StatisticsService::new(store);

        let snapshot = service.snapshot().await.unwrap();

        assert_eq!(snapshot.total_messages, 2);
        assert_eq!(snapshot.messages_by_status.get("failed"), Some(&1));
        assert_eq!(snapshot.messages_by_status.get("pending"), Some(&1));
        assert_eq!(snapshot.messages_last_day, 2);
        assert_eq!(snapshot.messages_updated_last_day, 2);
        assert_eq!(snapshot.average_message_length, 3.5);
    }

    #[tokio::test]
    async fn test_any_failed_aggregate_fails_snapshot() {
        let store = Arc::new(InMemoryMessageStore::new());
        store.save("hello").await.unwrap();
        store.fail_times(Fault::AverageLength, 1).await;
        let service = StatisticsService::new(store);

        let err = service.snapshot().await.unwrap_err();

        assert_eq!(err.op, "storage.memory.average_length");
    }
}
