//! # Component Container
//!
//! Builds every component from a [`ControlConfig`] and holds them for the
//! lifetime of the runtime.
//!
//! - The peer's auth gate and the controller's queue share one process but no
//!   state; they only meet through the loopback transport
//! - The controller identity is registered with the peer's resolver at
//!   build time

pub mod components;
pub mod config;

pub use components::{
    ComponentContainer, ContainerError, ControlQueue, ControllerTransport, PeerGate, PeerResolver,
};
pub use config::{ConfigError, ControlConfig, PresetSubscription, StorageBackend};
