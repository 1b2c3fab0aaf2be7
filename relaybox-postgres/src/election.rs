use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use relaybox_core::prelude::*;

use crate::storage_error;

const LEADER_KEY: &str = "outbox_leader";

/// Heartbeat-row leader election against the shared database.
///
/// One row, keyed by a constant, records the current lease holder and its
/// last heartbeat. Each election tick either refreshes our heartbeat, steals
/// a stale lease through a fenced conditional UPSERT, or observes a live
/// lease held elsewhere. Any database error demotes this instance before the
/// processor's next decision, so a partition from the database stops
/// publishing instead of splitting the brain.
pub struct PostgresLeaderElection {
    inner: Arc<Inner>,
    runtime: Mutex<Runtime>,
}

struct Inner {
    pool: PgPool,
    instance_id: InstanceId,
    config: ElectionConfig,
    is_leader: AtomicBool,
}

#[derive(Default)]
struct Runtime {
    shutdown_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl PostgresLeaderElection {
    pub fn new(pool: PgPool, instance_id: InstanceId, config: ElectionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                pool,
                instance_id,
                config,
                is_leader: AtomicBool::new(false),
            }),
            runtime: Mutex::new(Runtime::default()),
        }
    }
}

#[async_trait]
impl LeaderElection for PostgresLeaderElection {
    async fn start(&self) -> Result<(), OutboxError> {
        let mut runtime = self.runtime.lock().await;
        if runtime.handle.is_some() {
            return Ok(());
        }
        let (tx, rx) = watch::channel(false);
        runtime.handle = Some(tokio::spawn(election_loop(self.inner.clone(), rx)));
        runtime.shutdown_tx = Some(tx);
        Ok(())
    }

    async fn stop(&self) -> Result<(), OutboxError> {
        let mut runtime = self.runtime.lock().await;
        if let Some(tx) = runtime.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = runtime.handle.take() {
            if let Err(e) = handle.await {
                error!("election loop terminated abnormally: {e}");
            }
        }
        drop(runtime);

        // Release the claim so a successor does not wait out the lease.
        let was_leader = self.inner.is_leader.swap(false, Ordering::SeqCst);
        if was_leader {
            sqlx::query("DELETE FROM leader_election WHERE id = $1 AND instance_id = $2")
                .bind(LEADER_KEY)
                .bind(self.inner.instance_id.as_str())
                .execute(&self.inner.pool)
                .await
                .map_err(storage_error)?;
            info!("instance {} released leadership", self.inner.instance_id);
        }
        Ok(())
    }

    fn is_leader(&self) -> bool {
        self.inner.is_leader.load(Ordering::SeqCst)
    }
}

async fn election_loop(inner: Arc<Inner>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(inner.config.election_interval);
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = inner.run_election_round().await {
                    error!("election round failed: {e}");
                    inner.set_leader(false);
                }
            }
        }
    }
}

impl Inner {
    async fn run_election_round(&self) -> Result<(), OutboxError> {
        let row: Option<(String, OffsetDateTime)> = sqlx::query_as(
            "SELECT instance_id, last_heartbeat FROM leader_election WHERE id = $1",
        )
        .bind(LEADER_KEY)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        match row {
            Some((holder, last_heartbeat))
                if !lease_is_stale(
                    last_heartbeat,
                    OffsetDateTime::now_utc(),
                    self.config.lease_ttl,
                ) =>
            {
                if holder == self.instance_id.as_str() {
                    self.refresh_heartbeat().await
                } else {
                    // Live lease held by another replica.
                    self.set_leader(false);
                    Ok(())
                }
            }
            _ => self.try_claim().await,
        }
    }

    /// Claim an absent or stale lease. The conditional in the UPSERT is the
    /// fence: two replicas racing for the same stale lease produce exactly
    /// one winner, because the loser's update matches zero rows.
    async fn try_claim(&self) -> Result<(), OutboxError> {
        sqlx::query(
            r"
            INSERT INTO leader_election (id, instance_id, last_heartbeat)
            VALUES ($1, $2, now())
            ON CONFLICT (id) DO UPDATE
            SET instance_id = EXCLUDED.instance_id, last_heartbeat = EXCLUDED.last_heartbeat
            WHERE leader_election.last_heartbeat < now() - ($3 * interval '1 second')
            ",
        )
        .bind(LEADER_KEY)
        .bind(self.instance_id.as_str())
        .bind(self.config.lease_ttl.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        // Leadership only counts once the acknowledged row carries our id.
        let holder: Option<String> =
            sqlx::query_scalar("SELECT instance_id FROM leader_election WHERE id = $1")
                .bind(LEADER_KEY)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        self.set_leader(holder.as_deref() == Some(self.instance_id.as_str()));
        Ok(())
    }

    /// Refresh our heartbeat. Zero rows affected means the lease was stolen
    /// from under us.
    async fn refresh_heartbeat(&self) -> Result<(), OutboxError> {
        let result = sqlx::query(
            "UPDATE leader_election SET last_heartbeat = now() WHERE id = $1 AND instance_id = $2",
        )
        .bind(LEADER_KEY)
        .bind(self.instance_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        self.set_leader(result.rows_affected() > 0);
        Ok(())
    }

    fn set_leader(&self, leader: bool) {
        let was = self.is_leader.swap(leader, Ordering::SeqCst);
        if was != leader {
            if leader {
                info!("instance {} became the leader", self.instance_id);
            } else {
                info!("instance {} lost leadership", self.instance_id);
            }
        }
    }
}

/// A lease older than the TTL no longer protects its holder.
fn lease_is_stale(last_heartbeat: OffsetDateTime, now: OffsetDateTime, ttl: Duration) -> bool {
    (now - last_heartbeat).as_seconds_f64() > ttl.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_within_ttl_is_live() {
        let now = OffsetDateTime::now_utc();
        let ttl = Duration::from_secs(10);
        assert!(!lease_is_stale(now - time::Duration::seconds(9), now, ttl));
    }

    #[test]
    fn lease_at_exactly_ttl_is_still_live() {
        let now = OffsetDateTime::now_utc();
        let ttl = Duration::from_secs(10);
        assert!(!lease_is_stale(now - time::Duration::seconds(10), now, ttl));
    }

    #[test]
    fn lease_past_ttl_is_stale() {
        let now = OffsetDateTime::now_utc();
        let ttl = Duration::from_secs(10);
        assert!(lease_is_stale(now - time::Duration::seconds(11), now, ttl));
    }
}
