//! # Command Queue Subsystem (PC-02)
//!
//! Durable outbound queue giving at-least-once delivery across connectivity
//! loss.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): rows, statuses, retry and backoff policy
//! - **Ports Layer** (`ports/`): `CommandQueueApi` inbound; `CommandStore`
//!   and `CommandTransport` outbound
//! - **Service Layer** (`service.rs`): drain pass, retry bookkeeping
//! - **Auto-Drain** (`auto_drain.rs`): connectivity-driven background task
//! - **Adapters** (`adapters/`): in-memory store, RocksDB store (feature
//!   `rocksdb`)
//!
//! ## Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `enqueue` | insert pending row, `retries = 0` |
//! | `dequeue_and_send` | sequential pass over pending rows in insertion order |
//! | `reset_failed_commands` | failed -> pending, `retries = 0` |
//! | `retry_failed_commands` | reset, then drain |
//! | `cleanup_old_commands` | delete rows older than a threshold, any status |
//! | `clear` | delete pending rows only |
//! | `stats` | group-by status over persisted rows |
//! | `recover_interrupted` | sending -> pending after a crash |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod auto_drain;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::memory::InMemoryCommandStore;
#[cfg(feature = "rocksdb")]
pub use adapters::rocksdb::{RocksDbCommandStore, RocksDbConfig};
pub use auto_drain::{spawn_auto_drain, AutoDrainHandle};
pub use domain::entities::{
    CommandId, CommandStatus, DispatchedCommand, OutboundCommand, QueueStats, QueuedCommand,
};
pub use domain::errors::{PersistenceError, QueueError, TransportError};
pub use domain::retry::{BackoffPolicy, QueueConfig};
pub use ports::inbound::CommandQueueApi;
pub use ports::outbound::{CommandStore, CommandTransport};
pub use service::CommandQueue;
