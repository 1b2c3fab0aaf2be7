use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::config::ProcessorConfig;
use crate::election::LeaderElection;
use crate::error::OutboxError;
use crate::model::OutboxMessage;
use crate::publisher::Publisher;
use crate::storage::OutboxStorage;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ProcessorState {
    Idle,
    Running,
    Stopping,
}

/// Polling drain loop over the outbox table.
///
/// Every `polling_interval` the loop consults the elector and, only while
/// this replica holds leadership, drains one batch in sequence order. A crash
/// between the claim and the terminal transition leaves the row in
/// `processing`; recovery of such rows is an operator reset, not something
/// the loop attempts on its own.
pub struct Processor<S, P, L> {
    worker: Arc<BatchWorker<S, P>>,
    elector: Arc<L>,
    polling_interval: Duration,
    state: ProcessorState,
    shutdown_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl<S, P, L> Processor<S, P, L>
where
    S: OutboxStorage + 'static,
    P: Publisher + 'static,
    L: LeaderElection + 'static,
{
    pub fn new(
        storage: Arc<S>,
        publisher: Arc<P>,
        elector: Arc<L>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            polling_interval: config.polling_interval,
            worker: Arc::new(BatchWorker {
                storage,
                publisher,
                config,
            }),
            elector,
            state: ProcessorState::Idle,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Start the elector and launch the poll loop. A no-op when already
    /// running.
    pub async fn start(&mut self) -> Result<(), OutboxError> {
        if self.state == ProcessorState::Running {
            return Ok(());
        }
        self.elector.start().await?;

        let (tx, rx) = watch::channel(false);
        self.handle = Some(tokio::spawn(process_loop(
            self.worker.clone(),
            self.elector.clone(),
            self.polling_interval,
            rx,
        )));
        self.shutdown_tx = Some(tx);
        self.state = ProcessorState::Running;
        Ok(())
    }

    /// Signal the loop, wait for any in-flight batch to drain, then stop the
    /// elector. A no-op when idle.
    pub async fn stop(&mut self) -> Result<(), OutboxError> {
        if self.state == ProcessorState::Idle {
            return Ok(());
        }
        self.state = ProcessorState::Stopping;
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("processor loop terminated abnormally: {e}");
            }
        }
        self.elector.stop().await?;
        self.state = ProcessorState::Idle;
        Ok(())
    }
}

async fn process_loop<S, P, L>(
    worker: Arc<BatchWorker<S, P>>,
    elector: Arc<L>,
    polling_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    S: OutboxStorage,
    P: Publisher,
    L: LeaderElection,
{
    let mut ticker = tokio::time::interval(polling_interval);
    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if elector.is_leader() {
                    if let Err(e) = worker.process_batch().await {
                        error!("failed to process batch: {e}");
                    }
                }
            }
        }
    }
}

struct BatchWorker<S, P> {
    storage: Arc<S>,
    publisher: Arc<P>,
    config: ProcessorConfig,
}

impl<S, P> BatchWorker<S, P>
where
    S: OutboxStorage,
    P: Publisher,
{
    /// Drain one batch in sequence order. A storage error abandons the batch
    /// with no status change; publish errors are recorded per message and do
    /// not stop the rest of the batch.
    async fn process_batch(&self) -> Result<(), OutboxError> {
        let messages = self.storage.get_pending(self.config.batch_size).await?;
        if !messages.is_empty() {
            debug!("processing {} pending messages", messages.len());
        }
        for msg in &messages {
            if let Err(e) = self.process_message(msg).await {
                error!("error processing message {}: {e}", msg.id);
            }
        }
        Ok(())
    }

    async fn process_message(&self, msg: &OutboxMessage) -> Result<(), OutboxError> {
        if !self.storage.mark_processing(msg.id).await? {
            // Another instance won the claim for this row; not an error.
            debug!("message {} already claimed, skipping", msg.id);
            return Ok(());
        }

        match self.publisher.publish(&msg.topic, &msg.payload).await {
            Ok(()) => self.storage.mark_completed(msg.id).await,
            Err(publish_err) => {
                self.storage
                    .mark_failed(msg.id, &publish_err.to_string())
                    .await?;
                if msg.retry_count >= self.config.max_retries {
                    warn!(
                        "message {} exceeded {} retries and stays failed: {publish_err}",
                        msg.id, self.config.max_retries
                    );
                }
                Err(publish_err)
            }
        }
    }
}
