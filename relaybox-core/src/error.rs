use thiserror::Error;

use crate::object::MessageId;

/// Errors surfaced by the outbox core and its backends.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// The storage backend rejected or could not serve a call.
    #[error("storage unavailable: {0}")]
    Storage(String),

    /// The insert violated a database constraint.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A terminal transition targeted a row that does not exist.
    #[error("message {0} not found")]
    NotFound(MessageId),

    /// The broker refused or lost the message.
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
