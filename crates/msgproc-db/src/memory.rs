use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, Utc};
use msgproc_error::StorageError;
use tokio::sync::Mutex;
use tracing::warn;

use crate::models::{Message, MessageStatus};
use crate::store::MessageStore;

/// Operation that can be made to fail on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Save,
    UpdateContent(i64),
    UpdateStatus(i64),
    Find,
    Total,
    ByStatus,
    CreatedLastDay,
    UpdatedLastDay,
    AverageLength,
    Ping,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, Message>,
    faults: HashMap<Fault, u32>,
}

impl Inner {
    fn check(&mut self, fault: Fault, op: &'static str) -> Result<(), StorageError> {
        match self.faults.get_mut(&fault) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StorageError::new(op, "injected storage fault"))
            }
            _ => Ok(()),
        }
    }
}

/// Process-local MessageStore with the same observable semantics as the
/// PostgreSQL adapter. Ids start at 1.
#[derive(Default)]
pub struct InMemoryMessageStore {
    inner: Mutex<Inner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` calls of `fault` fail with a StorageError
    #[cfg(any(test, feature = "test-util"))]
    pub async fn fail_times(&self, fault: Fault, times: u32) {
        self.inner.lock().await.faults.insert(fault, times);
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, content: &str) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::Save, "storage.memory.save")?;

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        inner.rows.insert(
            id,
            Message {
                id,
                content: content.to_string(),
                status: MessageStatus::Pending,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<(), StorageError> {
        const OP: &str = "storage.memory.update_content";

        let mut inner = self.inner.lock().await;
        inner.check(Fault::UpdateContent(id), OP)?;

        let row = inner
            .rows
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found(OP, id))?;
        if row.content != content {
            row.content = content.to_string();
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status(&self, id: i64, status: MessageStatus) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::UpdateStatus(id), "storage.memory.update_status")?;

        match inner.rows.get_mut(&id) {
            Some(row) if row.status != status => {
                row.status = status;
                row.updated_at = Utc::now();
            }
            Some(_) => {}
            None => warn!(message_id = id, status = %status, "Status update matched no row"),
        }
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Option<Message>, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::Find, "storage.memory.find")?;
        Ok(inner.rows.get(&id).cloned())
    }

    async fn total(&self) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::Total, "storage.memory.total")?;
        Ok(inner.rows.len() as i64)
    }

    async fn by_status(&self) -> Result<BTreeMap<String, i64>, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::ByStatus, "storage.memory.by_status")?;

        let mut counts = BTreeMap::new();
        for row in inner.rows.values() {
            *counts.entry(row.status.as_str().to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn created_last_day(&self) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::CreatedLastDay, "storage.memory.created_last_day")?;

        let since = Utc::now() - Duration::days(1);
        Ok(inner.rows.values().filter(|r| r.created_at >= since).count() as i64)
    }

    async fn updated_last_day(&self) -> Result<i64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::UpdatedLastDay, "storage.memory.updated_last_day")?;

        let since = Utc::now() - Duration::days(1);
        Ok(inner.rows.values().filter(|r| r.updated_at >= since).count() as i64)
    }

    async fn average_length(&self) -> Result<f64, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check(Fault::AverageLength, "storage.memory.average_length")?;

        if inner.rows.is_empty() {
            return Ok(0.0);
        }
        let chars: usize = inner.rows.values().map(|r| r.content.chars().count()).sum();
        Ok(chars as f64 / inner.rows.len() as f64)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.inner.lock().await.check(Fault::Ping, "storage.memory.ping")
    }
}
