//! # Port Adapters
//!
//! Outbound port implementations the runtime plugs into the queue.
//!
//! - `loopback` - in-process link to a local peer, with a connectivity watch
//!   and a notification stream
//! - `signing` - signs each send attempt as the controller identity

pub mod loopback;
pub mod signing;

pub use loopback::{LoopbackTransport, PeerEndpoint};
pub use signing::SigningTransport;
