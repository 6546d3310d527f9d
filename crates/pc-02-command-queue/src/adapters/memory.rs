//! # In-Memory Command Store

use crate::domain::entities::{CommandId, CommandStatus, QueueStats, QueuedCommand};
use crate::domain::errors::PersistenceError;
use crate::ports::outbound::CommandStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Rows {
    last_id: CommandId,
    by_id: BTreeMap<CommandId, QueuedCommand>,
}

/// `CommandStore` over a `BTreeMap`, so iteration is insertion order.
#[derive(Debug, Default)]
pub struct InMemoryCommandStore {
    rows: Mutex<Rows>,
}

impl InMemoryCommandStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().by_id.is_empty()
    }
}

#[async_trait]
impl CommandStore for InMemoryCommandStore {
    async fn insert(&self, mut row: QueuedCommand) -> Result<CommandId, PersistenceError> {
        let mut rows = self.rows.lock();
        rows.last_id += 1;
        row.id = rows.last_id;
        rows.by_id.insert(row.id, row);
        Ok(rows.last_id)
    }

    async fn update(&self, row: &QueuedCommand) -> Result<(), PersistenceError> {
        let mut rows = self.rows.lock();
        match rows.by_id.get_mut(&row.id) {
            Some(existing) => {
                *existing = row.clone();
                Ok(())
            }
            None => Err(PersistenceError::NotFound(row.id)),
        }
    }

    async fn delete_by_id(&self, id: CommandId) -> Result<bool, PersistenceError> {
        Ok(self.rows.lock().by_id.remove(&id).is_some())
    }

    async fn get(&self, id: CommandId) -> Result<Option<QueuedCommand>, PersistenceError> {
        Ok(self.rows.lock().by_id.get(&id).cloned())
    }

    async fn get_commands_by_status(
        &self,
        status: CommandStatus,
    ) -> Result<Vec<QueuedCommand>, PersistenceError> {
        Ok(self
            .rows
            .lock()
            .by_id
            .values()
            .filter(|row| row.status == status)
            .cloned()
            .collect())
    }

    async fn get_recent_commands(&self, limit: usize) -> Result<Vec<QueuedCommand>, PersistenceError> {
        Ok(self.rows.lock().by_id.values().rev().take(limit).cloned().collect())
    }

    async fn count_by_status(&self) -> Result<QueueStats, PersistenceError> {
        Ok(QueueStats::from_statuses(
            self.rows.lock().by_id.values().map(|row| row.status),
        ))
    }

    async fn delete_old_commands(&self, cutoff_ms: u64) -> Result<usize, PersistenceError> {
        let mut rows = self.rows.lock();
        let before = rows.by_id.len();
        rows.by_id.retain(|_, row| row.timestamp >= cutoff_ms);
        Ok(before - rows.by_id.len())
    }

    async fn delete_pending(&self) -> Result<usize, PersistenceError> {
        let mut rows = self.rows.lock();
        let before = rows.by_id.len();
        rows.by_id.retain(|_, row| row.status != CommandStatus::Pending);
        Ok(before - rows.by_id.len())
    }
}
