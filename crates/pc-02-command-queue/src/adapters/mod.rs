//! # Storage Adapters
//!
//! - `memory`: in-process store for tests and ephemeral controllers
//! - `rocksdb` (feature `rocksdb`): durable store

pub mod memory;

#[cfg(feature = "rocksdb")]
pub mod rocksdb;
