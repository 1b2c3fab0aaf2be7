use std::time::Duration;

/// Producer tuning.
pub struct KafkaConfig {
    /// Broker-side delivery timeout for a single record.
    pub message_timeout: Duration,
    /// How long a publish may block when the producer queue is full.
    pub queue_timeout: Duration,
    /// Bound on the final flush during close.
    pub flush_timeout: Duration,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            message_timeout: Duration::from_secs(5),
            queue_timeout: Duration::ZERO,
            flush_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_do_not_block_the_processing_loop() {
        let config = KafkaConfig::default();
        assert_eq!(config.queue_timeout, Duration::ZERO);
        assert_eq!(config.message_timeout, Duration::from_secs(5));
        assert_eq!(config.flush_timeout, Duration::from_secs(5));
    }
}
