//! # Core Entities
//!
//! Transport-level values shared between the controller and the peer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque parameter map carried by commands and notifications.
pub type Params = serde_json::Map<String, Value>;

/// Connectivity of the underlying P2P link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// The session is established and sends may succeed.
    Connected,
    /// No session.
    #[default]
    Disconnected,
    /// A session is being negotiated.
    Connecting,
}

impl ConnectionState {
    /// Returns true only for `Connected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
        }
    }
}

/// An untyped notification pushed by the peer.
///
/// Notifications are transient: they are classified, dispatched and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventNotification {
    /// Dot-namespaced event name, e.g. `workflow.progress`.
    pub method: String,
    /// Event payload.
    #[serde(default)]
    pub params: Params,
}

impl EventNotification {
    /// Create a notification.
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Create a notification with an empty payload.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Params::new())
    }

    /// Look up a single payload field.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Returns true when `method` is `namespace` itself or lives under it.
///
/// `workflow.progress` is under `workflow`; `workflowx` is not.
#[must_use]
pub fn in_namespace(method: &str, namespace: &str) -> bool {
    match method.strip_prefix(namespace) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}
