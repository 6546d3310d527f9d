//! # Shared Types Crate
//!
//! Types that cross the controller/peer link, plus the security helpers both
//! ends must agree on byte-for-byte.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `SignedRequest` and `EventNotification` are
//!   defined once and used by every subsystem.
//! - **Immutable Envelope**: a `SignedRequest` exposes read-only accessors;
//!   there is no way to alter it after construction.
//! - **Deterministic Signing Payload**: `canonical_payload` is the only
//!   function allowed to produce the bytes that get signed.

pub mod entities;
pub mod envelope;
pub mod security;

pub use entities::*;
pub use envelope::SignedRequest;
pub use security::*;
