use async_trait::async_trait;

use crate::error::OutboxError;

/// At-most-one-leader coordination across replicas.
///
/// The processor consults [LeaderElection::is_leader] on every poll tick and
/// only the current leader drains the outbox.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderElection: Send + Sync {
    /// Begin campaigning. Idempotent.
    async fn start(&self) -> Result<(), OutboxError>;

    /// Stop campaigning and, when currently leader, release the claim so a
    /// successor does not have to wait out the lease.
    async fn stop(&self) -> Result<(), OutboxError>;

    /// Whether the last acknowledged election round made this instance the
    /// leader. Must flip to `false` when an election round fails.
    fn is_leader(&self) -> bool;
}
