//! # Domain Layer
//!
//! Queue rows, their lifecycle and the retry policy.

pub mod entities;
pub mod errors;
pub mod retry;
