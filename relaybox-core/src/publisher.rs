use async_trait::async_trait;

use crate::error::OutboxError;
use crate::object::Topic;

/// Black-box sink for drained messages.
///
/// Implementations are driven from the single processing loop and must report
/// broker connection loss as a failed publish, never a panic. Retry
/// accounting lives in the processor, not here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &Topic, payload: &[u8]) -> Result<(), OutboxError>;

    /// Release broker resources, flushing anything still in flight.
    async fn close(&self) -> Result<(), OutboxError>;
}
