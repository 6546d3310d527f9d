//! # Auth Gate Subsystem (PC-01)
//!
//! Verifies every inbound signed command before it is allowed to execute.
//!
//! ## Architecture
//!
//! This subsystem follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): nonce ledger, permission table, audit log,
//!   Ed25519 primitives. No I/O.
//! - **Ports Layer** (`ports/`): `AuthGateApi` inbound; `IdentityResolver`
//!   and `PermissionPolicy` outbound
//! - **Service Layer** (`service.rs`): the ordered verification pipeline
//! - **Adapters** (`adapters/`): static and caching identity resolvers
//!
//! ## Security Notes
//!
//! - **Method Binding**: the signature covers the method the dispatcher is
//!   about to execute, so re-labelling a captured request fails
//! - **Replay**: each `(identity, nonce)` is accepted at most once while the
//!   ledger holds it, and the ledger outlives the freshness window
//! - **Nonce burn**: a nonce is consumed before the signature is checked, so a
//!   forged request also burns the nonce it guessed
//! - **Opaque outcome**: callers learn only granted/denied; the reason goes to
//!   the audit log

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::resolver::{CachingIdentityResolver, StaticIdentityResolver};
pub use domain::audit::{AuditLog, DEFAULT_AUDIT_CAPACITY};
pub use domain::entities::{AuditLogEntry, PermissionLevel, ReasonCode};
pub use domain::errors::{AuthError, CryptoError, ResolutionError};
pub use domain::nonce_ledger::{NonceLedger, DEFAULT_MAX_LEDGER_ENTRIES};
pub use domain::permissions::PermissionTable;
pub use domain::signature::{PublicKey, RequestSigner};
pub use ports::inbound::AuthGateApi;
pub use ports::outbound::{IdentityResolver, PermissionPolicy};
pub use service::{AuthGate, AuthGateConfig};
