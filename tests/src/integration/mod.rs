//! # Integration Tests
//!
//! Flows that cross the auth gate, queue and router.

pub mod control_channel;
pub mod event_streams;
pub mod offline_delivery;
