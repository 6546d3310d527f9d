//! # Peer Handlers
//!
//! What the peer does with a command once it arrives.

pub mod command;

pub use command::PeerCommandHandler;
