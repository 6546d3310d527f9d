//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the peer's command dispatcher uses
//! - **Outbound (Driven)**: Identity resolution and permission lookup

pub mod inbound;
pub mod outbound;
