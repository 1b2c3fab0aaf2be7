use async_trait::async_trait;
use sqlx::{Postgres, Transaction};

use crate::error::OutboxError;
use crate::model::OutboxMessage;
use crate::object::MessageId;

/// Write side of the outbox: appends messages inside the caller's transaction
/// so the business change and the intent to publish commit atomically.
#[async_trait]
pub trait OutboxWriter: Send + Sync {
    /// Insert `msg` using the caller's transaction handle. Implementations
    /// must not open a transaction of their own; the row becomes visible,
    /// with its assigned sequence number, when the caller commits.
    async fn enqueue(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        msg: &OutboxMessage,
    ) -> Result<(), OutboxError>;
}

/// Drain side of the outbox, used by the processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutboxStorage: Send + Sync {
    /// Up to `limit` pending messages, ascending sequence number. Snapshot
    /// read, no locks; an empty result is a normal outcome.
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxMessage>, OutboxError>;

    /// Conditional `pending -> processing` transition. Returns `false` when
    /// zero rows were affected: the row is gone or another instance claimed
    /// it first. This conditional update is the only fence between
    /// processors and message state.
    async fn mark_processing(&self, id: MessageId) -> Result<bool, OutboxError>;

    /// Terminal `completed` transition; stamps `processed_at`.
    async fn mark_completed(&self, id: MessageId) -> Result<(), OutboxError>;

    /// Terminal `failed` transition; stamps `processed_at`, increments
    /// `retry_count` and records the last publish error.
    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), OutboxError>;
}
