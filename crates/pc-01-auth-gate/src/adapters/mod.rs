//! # Adapters
//!
//! Concrete identity resolvers.

pub mod resolver;
