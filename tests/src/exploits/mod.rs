//! # Exploit Simulations
//!
//! Each module plays an attacker against a peer guarded by the auth gate and
//! asserts that nothing runs and the attempt is audited.

pub mod forged_identity;
pub mod method_substitution;
pub mod replay;
