//! # Ports Layer
//!
//! - **Inbound (Driving)**: `CommandQueueApi`, used by the controller
//! - **Outbound (Driven)**: `CommandStore` persistence and `CommandTransport`

pub mod inbound;
pub mod outbound;
