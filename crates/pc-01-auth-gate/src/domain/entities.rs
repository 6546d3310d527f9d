//! # Auth Gate Entities
//!
//! Permission tiers and the audit record produced by every decision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered trust tier gating methods.
///
/// `Public < User < Admin < Owner`. An identity with level `L` may invoke any
/// method whose required level is `<= L`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Public = 0,
    User = 1,
    Admin = 2,
    Owner = 3,
}

impl PermissionLevel {
    /// Returns true when this level satisfies `required`.
    #[must_use]
    pub fn allows(self, required: PermissionLevel) -> bool {
        self >= required
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::User => "user",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            other => Err(format!("unknown permission level: {other}")),
        }
    }
}

/// Why a request was granted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    Granted,
    ValidationError,
    ExpiredTimestamp,
    ReplayedNonce,
    InvalidSignature,
    InsufficientPermission,
    ResolutionError,
}

impl ReasonCode {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::ValidationError => "validation_error",
            Self::ExpiredTimestamp => "expired_timestamp",
            Self::ReplayedNonce => "replayed_nonce",
            Self::InvalidSignature => "invalid_signature",
            Self::InsufficientPermission => "insufficient_permission",
            Self::ResolutionError => "resolution_error",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One authorization decision. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub identity: String,
    /// The verification-time method, not the one claimed in the envelope.
    pub method: String,
    pub granted: bool,
    pub reason: ReasonCode,
    /// Decision time in epoch milliseconds.
    pub timestamp: u64,
}
