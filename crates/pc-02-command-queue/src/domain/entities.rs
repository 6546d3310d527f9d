//! # Queue Entities
//!
//! ```text
//! enqueue ──→ [PENDING] ──drain──→ [SENDING] ──ok──→ (deleted)
//!                 ↑                    │
//!                 └──── retries < max ─┤
//!                                      └── retries >= max ──→ [FAILED]
//!
//! [FAILED] ──retry_failed_commands──→ [PENDING] (retries = 0)
//! ```

use crate::domain::errors::QueueError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::Params;
use std::fmt;

/// Row identifier, assigned by the store in insertion order.
pub type CommandId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Sending,
    Failed,
}

impl CommandStatus {
    pub const ALL: [CommandStatus; 3] = [Self::Pending, Self::Sending, Self::Failed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command as handed to the queue by the controller.
///
/// `auth` is typically a serialized `SignedRequest`; the queue never looks
/// inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundCommand {
    pub method: String,
    #[serde(default)]
    pub params: Params,
    #[serde(default)]
    pub auth: Option<Value>,
}

impl OutboundCommand {
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
            auth: None,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Value) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// Persisted queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedCommand {
    pub id: CommandId,
    pub method: String,
    /// JSON-encoded params.
    pub params: String,
    /// JSON-encoded auth envelope.
    pub auth: Option<String>,
    /// Enqueue time (epoch ms).
    pub timestamp: u64,
    /// Time of the last state transition (epoch ms).
    pub updated_at: u64,
    pub retries: u32,
    pub status: CommandStatus,
    pub error_message: Option<String>,
}

impl QueuedCommand {
    /// Build a fresh pending row. The store assigns `id` on insert.
    pub fn pending(command: &OutboundCommand, now_ms: u64) -> Result<Self, QueueError> {
        let params = serde_json::to_string(&command.params)
            .map_err(|e| QueueError::Serialization(e.to_string()))?;
        let auth = command
            .auth
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| QueueError::Serialization(e.to_string()))?;

        Ok(Self {
            id: 0,
            method: command.method.clone(),
            params,
            auth,
            timestamp: now_ms,
            updated_at: now_ms,
            retries: 0,
            status: CommandStatus::Pending,
            error_message: None,
        })
    }

    /// Decode the stored payload for the transport.
    pub fn to_dispatched(&self) -> Result<DispatchedCommand, QueueError> {
        let params: Params = serde_json::from_str(&self.params)
            .map_err(|e| QueueError::Serialization(format!("params of #{}: {e}", self.id)))?;
        let auth = self
            .auth
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .map_err(|e| QueueError::Serialization(format!("auth of #{}: {e}", self.id)))?;

        Ok(DispatchedCommand {
            id: self.id,
            method: self.method.clone(),
            params,
            auth,
        })
    }
}

/// What the transport receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedCommand {
    pub id: CommandId,
    pub method: String,
    pub params: Params,
    pub auth: Option<Value>,
}

/// Snapshot recomputed from persisted rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub sending: usize,
    pub failed: usize,
}

impl QueueStats {
    /// Tally rows by status.
    pub fn from_statuses<I: IntoIterator<Item = CommandStatus>>(statuses: I) -> Self {
        let mut stats = Self::default();
        for status in statuses {
            stats.record(status);
        }
        stats
    }

    pub fn record(&mut self, status: CommandStatus) {
        self.total += 1;
        match status {
            CommandStatus::Pending => self.pending += 1,
            CommandStatus::Sending => self.sending += 1,
            CommandStatus::Failed => self.failed += 1,
        }
    }

    pub fn count(&self, status: CommandStatus) -> usize {
        match status {
            CommandStatus::Pending => self.pending,
            CommandStatus::Sending => self.sending,
            CommandStatus::Failed => self.failed,
        }
    }
}
