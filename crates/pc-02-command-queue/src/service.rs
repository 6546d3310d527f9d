//! # Command Queue Service
//!
//! Implements `CommandQueueApi` on top of a `CommandStore` and a
//! `CommandTransport`.
//!
//! ## Delivery Guarantees
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | No lost command | row is deleted only after the transport confirms |
//! | No double send | drain passes are serialized by `drain_lock` |
//! | Bounded attempts | `retries >= max_retries` parks the row as failed |
//! | Failure isolation | a failed send only updates its own row |
//!
//! A crash between marking a row `sending` and deleting it leaves the row in
//! `sending`; `recover_interrupted` returns it to pending on startup, which
//! may resend it (at-least-once).

use crate::domain::entities::{CommandId, CommandStatus, OutboundCommand, QueueStats, QueuedCommand};
use crate::domain::errors::{PersistenceError, QueueError, TransportError};
use crate::domain::retry::QueueConfig;
use crate::ports::inbound::CommandQueueApi;
use crate::ports::outbound::{CommandStore, CommandTransport};
use async_trait::async_trait;
use shared_types::{SystemTimeSource, TimeSource};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Durable outbound queue.
pub struct CommandQueue<S, T, C = SystemTimeSource> {
    store: S,
    transport: T,
    config: QueueConfig,
    clock: C,
    /// Held for the whole of a drain pass.
    drain_lock: Mutex<()>,
}

impl<S: CommandStore, T: CommandTransport> CommandQueue<S, T, SystemTimeSource> {
    pub fn new(store: S, transport: T, config: QueueConfig) -> Self {
        Self::with_clock(store, transport, config, SystemTimeSource)
    }
}

impl<S, T, C> CommandQueue<S, T, C>
where
    S: CommandStore,
    T: CommandTransport,
    C: TimeSource,
{
    pub fn with_clock(store: S, transport: T, config: QueueConfig, clock: C) -> Self {
        Self {
            store,
            transport,
            config,
            clock,
            drain_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn pending_count(&self) -> Result<usize, QueueError> {
        Ok(self.store.count_pending().await?)
    }

    /// Move rows stranded in `sending` by a crash back to pending.
    pub async fn recover_interrupted(&self) -> Result<usize, QueueError> {
        let _drain = self.drain_lock.lock().await;
        let stranded = self.store.get_commands_by_status(CommandStatus::Sending).await?;
        let now = self.clock.now_ms();
        let mut recovered = 0;
        for mut row in stranded {
            row.status = CommandStatus::Pending;
            row.updated_at = now;
            self.store.update(&row).await?;
            recovered += 1;
        }
        if recovered > 0 {
            info!(recovered, "Recovered interrupted commands");
        }
        Ok(recovered)
    }

    /// Attempt one row. `Ok(true)` when delivered.
    async fn send_one(&self, mut row: QueuedCommand) -> Result<bool, QueueError> {
        let dispatched = match row.to_dispatched() {
            Ok(dispatched) => dispatched,
            Err(e) => {
                warn!(id = row.id, error = %e, "Undecodable command payload");
                self.record_failure(row, e.to_string()).await?;
                return Ok(false);
            }
        };

        row.status = CommandStatus::Sending;
        row.updated_at = self.clock.now_ms();
        if let Err(e) = self.store.update(&row).await {
            // Row is still pending in storage; the next pass picks it up
            error!(id = row.id, error = %e, "Failed to mark command as sending, skipping");
            return Ok(false);
        }

        let timeout_ms = self.config.send_timeout_ms;
        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.transport.send(&dispatched),
        )
        .await
        .unwrap_or(Err(TransportError::Timeout { ms: timeout_ms }));

        match result {
            Ok(_) => {
                match self.store.delete_by_id(row.id).await {
                    Ok(_) => debug!(id = row.id, method = %row.method, "Command delivered"),
                    Err(e) => error!(
                        id = row.id,
                        error = %e,
                        "Command delivered but row could not be deleted"
                    ),
                }
                Ok(true)
            }
            Err(e) => {
                warn!(id = row.id, method = %row.method, error = %e, "Command send failed");
                self.record_failure(row, e.to_string()).await?;
                Ok(false)
            }
        }
    }

    async fn record_failure(&self, mut row: QueuedCommand, message: String) -> Result<(), QueueError> {
        row.retries = row.retries.saturating_add(1);
        row.error_message = Some(message);
        row.updated_at = self.clock.now_ms();
        row.status = if row.retries >= self.config.max_retries {
            warn!(id = row.id, retries = row.retries, "Command exceeded max retries");
            CommandStatus::Failed
        } else {
            CommandStatus::Pending
        };

        match self.store.update(&row).await {
            Ok(()) => Ok(()),
            Err(PersistenceError::NotFound(id)) => {
                debug!(id, "Command removed during send, nothing to record");
                Ok(())
            }
            Err(source) => Err(QueueError::RetryStateLost { id: row.id, source }),
        }
    }
}

#[async_trait]
impl<S, T, C> CommandQueueApi for CommandQueue<S, T, C>
where
    S: CommandStore,
    T: CommandTransport,
    C: TimeSource,
{
    async fn enqueue(&self, command: OutboundCommand) -> Result<CommandId, QueueError> {
        let row = QueuedCommand::pending(&command, self.clock.now_ms())?;
        let id = self.store.insert(row).await?;
        debug!(id, method = %command.method, "Command enqueued");
        Ok(id)
    }

    async fn dequeue_and_send(&self) -> Result<usize, QueueError> {
        let _drain = self.drain_lock.lock().await;

        let pending = self.store.get_pending_commands().await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now_ms();
        let mut delivered = 0;
        let mut attempted = 0;
        for row in pending {
            if !self.config.backoff.is_ready(&row, now) {
                continue;
            }
            attempted += 1;
            if self.send_one(row).await? {
                delivered += 1;
            }
        }

        if attempted > 0 {
            info!(attempted, delivered, "Drain pass complete");
        }
        Ok(delivered)
    }

    async fn reset_failed_commands(&self) -> Result<usize, QueueError> {
        let failed = self.store.get_commands_by_status(CommandStatus::Failed).await?;
        let now = self.clock.now_ms();
        let mut reset = 0;
        for mut row in failed {
            row.retries = 0;
            row.error_message = None;
            row.status = CommandStatus::Pending;
            row.updated_at = now;
            self.store.update(&row).await?;
            reset += 1;
        }

        if reset > 0 {
            info!(reset, "Reset failed commands");
        }
        Ok(reset)
    }

    async fn cleanup_old_commands(&self, max_age_ms: u64) -> Result<usize, QueueError> {
        let _drain = self.drain_lock.lock().await;
        let cutoff = self.clock.now_ms().saturating_sub(max_age_ms);
        let removed = self.store.delete_old_commands(cutoff).await?;
        if removed > 0 {
            info!(removed, max_age_ms, "Purged old commands");
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<usize, QueueError> {
        let _drain = self.drain_lock.lock().await;
        Ok(self.store.delete_pending().await?)
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(self.store.count_by_status().await?)
    }

    async fn recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, QueueError> {
        Ok(self.store.get_recent_commands(limit).await?)
    }
}
