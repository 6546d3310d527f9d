//! # Control Runtime Library
//!
//! Wires the auth gate, command queue and event router into a running
//! controller. The main entry point is the `main.rs` binary; the library is
//! exposed for the cross-crate test suite.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and component construction
//! - `adapters/` - loopback transport and send-time signing
//! - `handlers/` - peer-side command execution behind the auth gate
//! - `wiring/` - metrics feeds and the runtime's own subscriptions
//!
//! ## Command Flow
//!
//! ```text
//! submit ──→ CommandQueue ──auto-drain──→ SigningTransport ──→ LoopbackTransport
//!                                                                    │
//!                                                                    ▼
//!                             EventRouter ←──events── PeerCommandHandler ──→ AuthGate
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::panic))]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;
pub mod wiring;

pub use container::{ComponentContainer, ConfigError, ContainerError, ControlConfig};
pub use runtime::ControlRuntime;
