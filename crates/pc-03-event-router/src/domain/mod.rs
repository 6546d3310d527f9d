//! # Domain Layer
//!
//! Classification, subscription matching and preset tables. All pure and
//! synchronous.

pub mod category;
pub mod presets;
pub mod subscription;
