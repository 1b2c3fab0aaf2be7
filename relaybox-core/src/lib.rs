//! Core of the relaybox transactional outbox: the message model, the
//! capability traits for storage, publishing and leader election, and the
//! polling processor that drains the outbox from exactly one replica.

mod config;
mod election;
mod error;
mod memory;
mod model;
mod object;
mod processor;
mod publisher;
mod storage;

pub mod prelude {
    pub use crate::config::{ElectionConfig, ProcessorConfig};
    pub use crate::election::LeaderElection;
    pub use crate::error::OutboxError;
    pub use crate::memory::InMemoryStorage;
    pub use crate::model::{MessageStatus, OutboxMessage};
    pub use crate::object::{InstanceId, MessageId, Topic, MAX_TOPIC_LEN};
    pub use crate::processor::Processor;
    pub use crate::publisher::Publisher;
    pub use crate::storage::{OutboxStorage, OutboxWriter};
}
