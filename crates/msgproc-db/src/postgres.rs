use std::collections::BTreeMap;

use msgproc_error::StorageError;
use tracing::{debug, warn};

use crate::DbPool;
use crate::models::{Message, MessageRecord, MessageStatus};
use crate::store::MessageStore;

/// PostgreSQL implementation of MessageStore
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: DbPool,
}

impl PostgresMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageStore for PostgresMessageStore {
    async fn save(&self, content: &str) -> Result<i64, StorageError> {
        const OP: &str = "storage.postgres.save";

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::new(OP, e))?;

        // A panic past this point drops `tx`, which rolls the transaction back.
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (content)
            VALUES ($1)
            RETURNING id
            "#,
        )
        .bind(content)
        .fetch_one(&mut *tx)
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, op = OP, "Rollback after failed insert also failed");
                }
                return Err(StorageError::new(OP, e));
            }
        };

        tx.commit().await.map_err(|e| StorageError::new(OP, e))?;

        debug!(message_id = id, "Message row committed");
        Ok(id)
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<(), StorageError> {
        const OP: &str = "storage.postgres.update_content";

        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = $1,
                updated_at = CASE WHEN content IS DISTINCT FROM $1 THEN NOW() ELSE updated_at END
            WHERE id = $2
            "#,
        )
        .bind(content)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::new(OP, e))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(OP, id));
        }

        Ok(())
    }

    async fn update_status(&self, id: i64, status: MessageStatus) -> Result<(), StorageError> {
        const OP: &str = "storage.postgres.update_status";

        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = $1,
                updated_at = CASE WHEN status IS DISTINCT FROM $1 THEN NOW() ELSE updated_at END
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::new(OP, e))?;

        if result.rows_affected() == 0 {
            warn!(message_id = id, status = %status, "Status update matched no row");
        }

        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Option<Message>, StorageError> {
        const OP: &str = "storage.postgres.find";

        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, content, status, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::new(OP, e))?;

        record
            .map(Message::try_from)
            .transpose()
            .map_err(|e| StorageError::new(OP, e))
    }

    async fn total(&self) -> Result<i64, StorageError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::new("storage.postgres.total", e))
    }

    async fn by_status(&self) -> Result<BTreeMap<String, i64>, StorageError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
            FROM messages
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::new("storage.postgres.by_status", e))?;

        Ok(rows.into_iter().collect())
    }

    async fn created_last_day(&self) -> Result<i64, StorageError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE created_at >= NOW() - INTERVAL '1 day'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::new("storage.postgres.created_last_day", e))
    }

    async fn updated_last_day(&self) -> Result<i64, StorageError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE updated_at >= NOW() - INTERVAL '1 day'
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::new("storage.postgres.updated_last_day", e))
    }

    async fn average_length(&self) -> Result<f64, StorageError> {
        // AVG yields NUMERIC (and NULL on an empty table)
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(LENGTH(content))::DOUBLE PRECISION FROM messages",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::new("storage.postgres.average_length", e))?;

        Ok(avg.unwrap_or(0.0))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::new("storage.postgres.ping", e))?;
        Ok(())
    }
}
