//! Kafka publisher backend for relaybox.

mod config;

pub use config::KafkaConfig;

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use tracing::debug;

use relaybox_core::prelude::*;

/// `Publisher` over an rdkafka `FutureProducer`.
///
/// Driven by the single processing loop, so per-topic FIFO publish order is
/// inherited from the caller. Delivery failures, including a lost broker
/// connection, surface as `OutboxError::Publish`.
pub struct KafkaPublisher {
    producer: FutureProducer,
    config: KafkaConfig,
}

impl KafkaPublisher {
    pub fn new(bootstrap_servers: &str, config: KafkaConfig) -> Result<Self, OutboxError> {
        if bootstrap_servers.is_empty() {
            return Err(OutboxError::Config(
                "broker address must not be empty".to_owned(),
            ));
        }
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set(
                "message.timeout.ms",
                config.message_timeout.as_millis().to_string(),
            )
            .create()
            .map_err(|e| OutboxError::Config(format!("kafka producer: {e}")))?;
        Ok(Self { producer, config })
    }
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, topic: &Topic, payload: &[u8]) -> Result<(), OutboxError> {
        let record = FutureRecord::<(), _>::to(topic.as_str()).payload(payload);
        self.producer
            .send(record, self.config.queue_timeout)
            .await
            .map(|_| ())
            .map_err(|(err, _)| OutboxError::Publish(err.to_string()))
    }

    async fn close(&self) -> Result<(), OutboxError> {
        debug!("flushing kafka producer");
        self.producer
            .flush(self.config.flush_timeout)
            .map_err(|e| OutboxError::Publish(e.to_string()))
    }
}
