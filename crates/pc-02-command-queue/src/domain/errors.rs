//! # Queue Errors

use crate::domain::entities::CommandId;
use thiserror::Error;

/// Failure of the persistence collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Storage I/O failed: {0}")]
    Io(String),

    #[error("Row encoding failed: {0}")]
    Encoding(String),

    #[error("Command #{0} not found")]
    NotFound(CommandId),
}

/// Failure of a single send. Always isolated to that command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Send timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("Transport not connected")]
    NotConnected,

    /// The peer answered with an error.
    #[error("Peer rejected command: {0}")]
    Rejected(String),

    #[error("Transport I/O failed: {0}")]
    Io(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Command payload could not be encoded: {0}")]
    Serialization(String),

    /// A failed send could not be recorded. Draining stops so the attempt is
    /// not silently forgotten.
    #[error("Failed to persist retry state of command #{id}: {source}")]
    RetryStateLost {
        id: CommandId,
        #[source]
        source: PersistenceError,
    },
}
