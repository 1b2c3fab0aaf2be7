use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::error::OutboxError;
use crate::model::{MessageStatus, OutboxMessage};
use crate::object::MessageId;
use crate::storage::OutboxStorage;

/// In-process storage backend for tests and embedded development.
///
/// Mirrors the relational semantics: inserts assign a monotonic sequence
/// number and status transitions are conditional, so claim races behave the
/// same as against the SQL store.
#[derive(Default)]
pub struct InMemoryStorage {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    messages: Vec<OutboxMessage>,
    next_sequence: i64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message, assigning the next sequence number. Stands in for
    /// the transactional enqueue of a relational backend.
    pub async fn insert(&self, mut msg: OutboxMessage) -> MessageId {
        let mut inner = self.inner.lock().await;
        inner.next_sequence += 1;
        msg.sequence_number = inner.next_sequence;
        let id = msg.id;
        inner.messages.push(msg);
        id
    }

    /// Snapshot of one message, for assertions and tooling.
    pub async fn get(&self, id: MessageId) -> Option<OutboxMessage> {
        self.inner
            .lock()
            .await
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }
}

#[async_trait]
impl OutboxStorage for InMemoryStorage {
    async fn get_pending(&self, limit: u32) -> Result<Vec<OutboxMessage>, OutboxError> {
        let inner = self.inner.lock().await;
        let mut pending: Vec<OutboxMessage> = inner
            .messages
            .iter()
            .filter(|m| m.status == MessageStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.sequence_number);
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_processing(&self, id: MessageId) -> Result<bool, OutboxError> {
        let mut inner = self.inner.lock().await;
        match inner
            .messages
            .iter_mut()
            .find(|m| m.id == id && m.status == MessageStatus::Pending)
        {
            Some(msg) => {
                msg.status = MessageStatus::Processing;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_completed(&self, id: MessageId) -> Result<(), OutboxError> {
        let mut inner = self.inner.lock().await;
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(OutboxError::NotFound(id))?;
        msg.status = MessageStatus::Completed;
        msg.processed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), OutboxError> {
        let mut inner = self.inner.lock().await;
        let msg = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(OutboxError::NotFound(id))?;
        msg.status = MessageStatus::Failed;
        msg.retry_count += 1;
        msg.error = Some(error.to_owned());
        msg.processed_at = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Topic;

    fn msg(topic: &str) -> OutboxMessage {
        OutboxMessage::new(Topic::new(topic).unwrap(), b"{}".to_vec())
    }

    #[tokio::test]
    async fn insert_assigns_increasing_sequence_numbers() {
        let storage = InMemoryStorage::new();
        let first = storage.insert(msg("t")).await;
        let second = storage.insert(msg("t")).await;

        let a = storage.get(first).await.unwrap();
        let b = storage.get(second).await.unwrap();
        assert!(a.sequence_number < b.sequence_number);
    }

    #[tokio::test]
    async fn get_pending_orders_by_sequence_and_honors_limit() {
        let storage = InMemoryStorage::new();
        for _ in 0..3 {
            storage.insert(msg("t")).await;
        }

        let pending = storage.get_pending(2).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].sequence_number < pending[1].sequence_number);
    }

    #[tokio::test]
    async fn second_claim_loses() {
        let storage = InMemoryStorage::new();
        let id = storage.insert(msg("t")).await;

        assert!(storage.mark_processing(id).await.unwrap());
        assert!(!storage.mark_processing(id).await.unwrap());
    }

    #[tokio::test]
    async fn claimed_rows_leave_the_pending_scan() {
        let storage = InMemoryStorage::new();
        let id = storage.insert(msg("t")).await;
        storage.mark_processing(id).await.unwrap();

        assert!(storage.get_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_failed_accumulates_retry_count() {
        let storage = InMemoryStorage::new();
        let id = storage.insert(msg("t")).await;
        storage.mark_processing(id).await.unwrap();
        storage.mark_failed(id, "broker gone").await.unwrap();

        let failed = storage.get(id).await.unwrap();
        assert_eq!(failed.status, MessageStatus::Failed);
        assert_eq!(failed.retry_count, 1);
        assert_eq!(failed.error.as_deref(), Some("broker gone"));
        assert!(failed.processed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_transitions_on_unknown_id_report_not_found() {
        let storage = InMemoryStorage::new();
        let id = MessageId::default();
        assert!(matches!(
            storage.mark_completed(id).await,
            Err(OutboxError::NotFound(_))
        ));
        assert!(matches!(
            storage.mark_failed(id, "x").await,
            Err(OutboxError::NotFound(_))
        ));
    }
}
