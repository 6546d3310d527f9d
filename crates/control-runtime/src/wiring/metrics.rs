//! # Metrics Wiring

use async_trait::async_trait;
use control_telemetry::metrics::{
    record_auth_decision, record_drained, record_router_event, set_queue_depth,
};
use futures::{Stream, StreamExt};
use pc_01_auth_gate::AuditLog;
use pc_02_command_queue::{
    CommandId, CommandQueueApi, CommandStatus, OutboundCommand, QueueError, QueueStats,
    QueuedCommand,
};
use pc_03_event_router::classify;
use shared_types::EventNotification;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Feed every audited decision into `pc_auth_decisions_total`.
pub fn spawn_audit_metrics(audit: Arc<AuditLog>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    let mut decisions = audit.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = decisions.recv() => match next {
                    Ok(entry) => record_auth_decision(entry.granted, entry.reason.as_str()),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Audit metrics lagged behind the audit feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("Audit metrics stopped");
    })
}

/// Sample queue depth per status every `interval`.
pub fn spawn_queue_sampler<Q>(
    queue: Arc<Q>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    Q: CommandQueueApi + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => match queue.stats().await {
                    Ok(stats) => publish_depth(&stats),
                    Err(e) => warn!(error = %e, "Queue stats sampling failed"),
                },
            }
        }
        debug!("Queue sampler stopped");
    })
}

fn publish_depth(stats: &QueueStats) {
    for status in CommandStatus::ALL {
        set_queue_depth(status.as_str(), stats.count(status));
    }
}

/// Count each notification by category before it reaches the router.
pub fn metered_events<St>(events: St) -> impl Stream<Item = EventNotification> + Send + Unpin
where
    St: Stream<Item = EventNotification> + Send + Unpin,
{
    events.inspect(|event| record_router_event(classify(&event.method).map(|c| c.as_str())))
}

/// Queue decorator that counts delivered commands.
pub struct MeteredQueue<Q> {
    inner: Q,
}

impl<Q> MeteredQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Q {
        &self.inner
    }
}

#[async_trait]
impl<Q: CommandQueueApi> CommandQueueApi for MeteredQueue<Q> {
    async fn enqueue(&self, command: OutboundCommand) -> Result<CommandId, QueueError> {
        self.inner.enqueue(command).await
    }

    async fn dequeue_and_send(&self) -> Result<usize, QueueError> {
        let delivered = self.inner.dequeue_and_send().await?;
        record_drained(delivered);
        Ok(delivered)
    }

    async fn reset_failed_commands(&self) -> Result<usize, QueueError> {
        self.inner.reset_failed_commands().await
    }

    /// Resend through this decorator so the retried deliveries are counted.
    async fn retry_failed_commands(&self) -> Result<usize, QueueError> {
        let reset = self.inner.reset_failed_commands().await?;
        if reset > 0 {
            info!(reset, "Failed commands requeued");
            self.dequeue_and_send().await?;
        }
        Ok(reset)
    }

    async fn cleanup_old_commands(&self, max_age_ms: u64) -> Result<usize, QueueError> {
        self.inner.cleanup_old_commands(max_age_ms).await
    }

    async fn clear(&self) -> Result<usize, QueueError> {
        self.inner.clear().await
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.inner.stats().await
    }

    async fn recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, QueueError> {
        self.inner.recent_commands(limit).await
    }
}
