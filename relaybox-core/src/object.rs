use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OutboxError;

/// Longest topic name the broker accepts (Kafka caps names at 249 bytes).
pub const MAX_TOPIC_LEN: usize = 249;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct MessageId(Uuid);

impl Default for MessageId {
    fn default() -> Self {
        Self(Uuid::new_v4())
    }
}

impl MessageId {
    pub fn load(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Destination topic for a message. Validated once at construction; rows read
/// back from the store are re-wrapped with [Topic::load].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: &str) -> Result<Self, OutboxError> {
        if topic.is_empty() {
            return Err(OutboxError::InvalidTopic("topic must not be empty".to_owned()));
        }
        if topic.len() > MAX_TOPIC_LEN {
            return Err(OutboxError::InvalidTopic(format!(
                "topic exceeds {MAX_TOPIC_LEN} bytes"
            )));
        }
        Ok(Self(topic.to_owned()))
    }

    pub fn load(value: &str) -> Self {
        Self(value.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one replica of the host process. Must be unique per replica;
/// it is what the leader row records as the current lease holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: &str) -> Result<Self, OutboxError> {
        if id.is_empty() {
            return Err(OutboxError::Config("instance_id must not be empty".to_owned()));
        }
        Ok(Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_rejects_empty() {
        assert!(matches!(Topic::new(""), Err(OutboxError::InvalidTopic(_))));
    }

    #[test]
    fn topic_rejects_oversized() {
        let long = "t".repeat(MAX_TOPIC_LEN + 1);
        assert!(matches!(Topic::new(&long), Err(OutboxError::InvalidTopic(_))));
    }

    #[test]
    fn topic_accepts_boundary_length() {
        let max = "t".repeat(MAX_TOPIC_LEN);
        assert_eq!(Topic::new(&max).unwrap().as_str(), max);
    }

    #[test]
    fn instance_id_rejects_empty() {
        assert!(matches!(InstanceId::new(""), Err(OutboxError::Config(_))));
    }

    #[test]
    fn message_ids_are_unique() {
        assert_ne!(MessageId::default(), MessageId::default());
    }
}
