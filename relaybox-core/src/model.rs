use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::object::{MessageId, Topic};

/// One row of the outbox table.
///
/// Created by the host inside its own transaction, mutated only by the
/// processor afterwards. `sequence_number` is assigned by the store at INSERT
/// time and is the total order in which messages are drained.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutboxMessage {
    pub id: MessageId,
    pub topic: Topic,
    pub payload: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub processed_at: Option<OffsetDateTime>,
    pub status: MessageStatus,
    pub retry_count: i32,
    pub error: Option<String>,
    pub sequence_number: i64,
}

impl OutboxMessage {
    pub fn new(topic: Topic, payload: Vec<u8>) -> Self {
        Self {
            id: MessageId::default(),
            topic,
            payload,
            created_at: OffsetDateTime::now_utc(),
            processed_at: None,
            status: MessageStatus::Pending,
            retry_count: 0,
            error: None,
            // placeholder until the store assigns the real value at INSERT
            sequence_number: 0,
        }
    }
}

/// Lifecycle: `pending -> processing -> {completed, failed}`. A `failed` row
/// only moves again when an operator resets it to `pending`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Processing => "processing",
            MessageStatus::Completed => "completed",
            MessageStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_starts_pending() {
        let msg = OutboxMessage::new(Topic::new("orders.created").unwrap(), b"{}".to_vec());
        assert_eq!(msg.status, MessageStatus::Pending);
        assert_eq!(msg.retry_count, 0);
        assert!(msg.processed_at.is_none());
        assert!(msg.error.is_none());
        assert_eq!(msg.sequence_number, 0);
    }

    #[test]
    fn status_renders_lowercase() {
        assert_eq!(MessageStatus::Pending.to_string(), "pending");
        assert_eq!(MessageStatus::Processing.to_string(), "processing");
        assert_eq!(MessageStatus::Completed.to_string(), "completed");
        assert_eq!(MessageStatus::Failed.to_string(), "failed");
    }
}
