//! # Peer Control Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Shared gate/peer/queue builders
//! ├── exploits/         # Attack simulations against the auth gate
//! │   ├── replay.rs
//! │   ├── method_substitution.rs
//! │   └── forged_identity.rs
//! │
//! └── integration/      # Cross-crate flows
//!     ├── control_channel.rs
//!     ├── offline_delivery.rs
//!     └── event_streams.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pc-tests
//!
//! # By category
//! cargo test -p pc-tests integration::
//! cargo test -p pc-tests exploits::
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod exploits;
pub mod fixtures;
pub mod integration;
