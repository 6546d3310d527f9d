//! # Outbound Ports (Driven Ports / SPI)
//!
//! The queue owns no storage and no connection. Persisted rows are the only
//! source of truth for queue state.

use crate::domain::entities::{CommandId, CommandStatus, DispatchedCommand, QueueStats, QueuedCommand};
use crate::domain::errors::{PersistenceError, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Logical CRUD contract over queue rows.
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Persist a new row. `row.id` is ignored; the assigned id is returned
    /// and ids increase in insertion order.
    async fn insert(&self, row: QueuedCommand) -> Result<CommandId, PersistenceError>;

    /// Overwrite an existing row.
    ///
    /// # Errors
    /// * `PersistenceError::NotFound` - no row with `row.id`
    async fn update(&self, row: &QueuedCommand) -> Result<(), PersistenceError>;

    /// Returns false when the row did not exist.
    async fn delete_by_id(&self, id: CommandId) -> Result<bool, PersistenceError>;

    async fn delete(&self, row: &QueuedCommand) -> Result<bool, PersistenceError> {
        self.delete_by_id(row.id).await
    }

    async fn get(&self, id: CommandId) -> Result<Option<QueuedCommand>, PersistenceError>;

    /// Pending rows in insertion order.
    async fn get_pending_commands(&self) -> Result<Vec<QueuedCommand>, PersistenceError> {
        self.get_commands_by_status(CommandStatus::Pending).await
    }

    /// Rows with `status` in insertion order.
    async fn get_commands_by_status(
        &self,
        status: CommandStatus,
    ) -> Result<Vec<QueuedCommand>, PersistenceError>;

    /// Up to `limit` rows, newest first.
    async fn get_recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, PersistenceError>;

    async fn count_pending(&self) -> Result<usize, PersistenceError> {
        Ok(self.count_by_status().await?.pending)
    }

    /// Group-by status over every row.
    async fn count_by_status(&self) -> Result<QueueStats, PersistenceError>;

    /// Delete rows enqueued before `cutoff_ms`, whatever their status.
    async fn delete_old_commands(&self, cutoff_ms: u64) -> Result<usize, PersistenceError>;

    /// Delete all pending rows.
    async fn delete_pending(&self) -> Result<usize, PersistenceError>;
}

#[async_trait]
impl<T: CommandStore + ?Sized> CommandStore for Arc<T> {
    async fn insert(&self, row: QueuedCommand) -> Result<CommandId, PersistenceError> {
        (**self).insert(row).await
    }

    async fn update(&self, row: &QueuedCommand) -> Result<(), PersistenceError> {
        (**self).update(row).await
    }

    async fn delete_by_id(&self, id: CommandId) -> Result<bool, PersistenceError> {
        (**self).delete_by_id(id).await
    }

    async fn get(&self, id: CommandId) -> Result<Option<QueuedCommand>, PersistenceError> {
        (**self).get(id).await
    }

    async fn get_pending_commands(&self) -> Result<Vec<QueuedCommand>, PersistenceError> {
        (**self).get_pending_commands().await
    }

    async fn get_commands_by_status(
        &self,
        status: CommandStatus,
    ) -> Result<Vec<QueuedCommand>, PersistenceError> {
        (**self).get_commands_by_status(status).await
    }

    async fn get_recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, PersistenceError> {
        (**self).get_recent_commands(limit).await
    }

    async fn count_pending(&self) -> Result<usize, PersistenceError> {
        (**self).count_pending().await
    }

    async fn count_by_status(&self) -> Result<QueueStats, PersistenceError> {
        (**self).count_by_status().await
    }

    async fn delete_old_commands(&self, cutoff_ms: u64) -> Result<usize, PersistenceError> {
        (**self).delete_old_commands(cutoff_ms).await
    }

    async fn delete_pending(&self) -> Result<usize, PersistenceError> {
        (**self).delete_pending().await
    }
}

/// The send half of the P2P link.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Deliver one command and wait for the peer's response. The queue
    /// bounds this call with its send timeout.
    async fn send(&self, command: &DispatchedCommand) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: CommandTransport + ?Sized> CommandTransport for Arc<T> {
    async fn send(&self, command: &DispatchedCommand) -> Result<Value, TransportError> {
        (**self).send(command).await
    }
}
