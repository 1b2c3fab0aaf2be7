use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use relaybox_core::prelude::*;

use crate::storage_error;

/// Outbox storage over a shared connection pool.
///
/// The status machine lives in SQL: `mark_processing` only transitions rows
/// still in `pending`, so two processors racing during a leadership handover
/// cannot both claim the same message.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutboxWriter for PostgresStore {
    async fn enqueue(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        msg: &OutboxMessage,
    ) -> Result<(), OutboxError> {
        // sequence_number is assigned by the identity column at INSERT time,
        // giving commit-ordered draining without application coordination.
        sqlx::query(
            r"
            INSERT INTO outbox_messages (id, topic, payload, created_at, status)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(msg.id)
        .bind(msg.topic.as_str())
        .bind(&msg.payload)
        .bind(msg.created_at)
        .bind(msg.status)
        .execute(&mut **tx)
        .await
        .map_err(storage_error)?;
        Ok(())
    }
}

#[async_trait]
impl OutboxStorage for PostgresStore {
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxMessage>, OutboxError> {
        sqlx::query_as::<_, OutboxMessage>(
            r"
            SELECT id, topic, payload, created_at, processed_at, status,
                   retry_count, error, sequence_number
            FROM outbox_messages
            WHERE status = 'pending'
            ORDER BY sequence_number ASC
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn mark_processing(&self, id: MessageId) -> Result<bool, OutboxError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages
            SET status = 'processing'
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_completed(&self, id: MessageId) -> Result<(), OutboxError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages
            SET status = 'completed', processed_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(OutboxError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), OutboxError> {
        let result = sqlx::query(
            r"
            UPDATE outbox_messages
            SET status = 'failed',
                retry_count = retry_count + 1,
                error = $2,
                processed_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(OutboxError::NotFound(id));
        }
        Ok(())
    }
}
