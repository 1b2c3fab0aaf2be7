use std::time::Duration;

/// Tuning for the polling processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Period of the drain loop.
    pub polling_interval: Duration,
    /// Maximum messages fetched per batch.
    pub batch_size: u32,
    /// Failure count past which a message is flagged for operator attention.
    /// Failed messages are never requeued automatically.
    pub max_retries: i32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_millis(100),
            batch_size: 10,
            max_retries: 3,
        }
    }
}

/// Tuning for heartbeat-based leader election.
///
/// Keep `election_interval` well under half of `lease_ttl`: a leader that
/// misses one tick must still refresh its heartbeat before the lease becomes
/// stealable.
#[derive(Debug, Clone)]
pub struct ElectionConfig {
    /// Period of the election tick.
    pub election_interval: Duration,
    /// Age past which a leader record no longer protects its holder.
    pub lease_ttl: Duration,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        Self {
            election_interval: Duration::from_secs(3),
            lease_ttl: Duration::from_secs(10),
        }
    }
}
