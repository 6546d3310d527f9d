//! # Domain Layer
//!
//! Pure verification logic with no I/O dependencies.
//! This is the inner layer of the hexagonal architecture.

pub mod audit;
pub mod entities;
pub mod errors;
pub mod nonce_ledger;
pub mod permissions;
pub mod signature;
