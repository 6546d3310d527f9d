//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::{CommandId, OutboundCommand, QueueStats, QueuedCommand};
use crate::domain::errors::QueueError;
use async_trait::async_trait;

/// Primary command queue API.
#[async_trait]
pub trait CommandQueueApi: Send + Sync {
    /// Persist `command` as pending. Fails only on persistence error.
    async fn enqueue(&self, command: OutboundCommand) -> Result<CommandId, QueueError>;

    /// One drain pass over pending rows. Returns how many were delivered.
    async fn dequeue_and_send(&self) -> Result<usize, QueueError>;

    /// Reset every failed row to pending (retries 0, no error) without
    /// sending. Returns rows reset.
    async fn reset_failed_commands(&self) -> Result<usize, QueueError>;

    /// Reset every failed row to pending and drain. Returns rows reset.
    async fn retry_failed_commands(&self) -> Result<usize, QueueError> {
        let reset = self.reset_failed_commands().await?;
        if reset > 0 {
            self.dequeue_and_send().await?;
        }
        Ok(reset)
    }

    /// Delete rows older than `max_age_ms`, whatever their status.
    async fn cleanup_old_commands(&self, max_age_ms: u64) -> Result<usize, QueueError>;

    /// Delete pending rows only.
    async fn clear(&self) -> Result<usize, QueueError>;

    async fn stats(&self) -> Result<QueueStats, QueueError>;

    async fn recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, QueueError>;
}
