//! # Auth Gate Errors
//!
//! Every rejection the gate can produce. Callers of `verify` only ever see a
//! boolean; these values end up in the audit log and in logs.

use crate::domain::entities::{PermissionLevel, ReasonCode};
use thiserror::Error;

/// Low-level Ed25519 failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Bytes are the right size but not a valid curve point
    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    #[error("Signature verification failed")]
    SignatureMismatch,
}

/// Failure to obtain key material for an identity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// The resolver answered, but has no key for this identity
    #[error("Unknown identity: {0}")]
    UnknownIdentity(String),

    /// The resolver itself could not answer (network, storage, ...)
    #[error("Resolver unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid key material for {identity}: {source}")]
    InvalidKey {
        identity: String,
        #[source]
        source: CryptoError,
    },
}

/// Reason a signed request was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Incomplete request: missing {missing}")]
    Validation { missing: &'static str },

    #[error("Timestamp {timestamp} outside window of {window_ms}ms (now {now})")]
    ExpiredTimestamp {
        timestamp: u64,
        now: u64,
        window_ms: u64,
    },

    #[error("Replayed nonce: {key}")]
    ReplayedNonce { key: String },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Insufficient permission: requires {required}, identity has {granted}")]
    InsufficientPermission {
        required: PermissionLevel,
        granted: PermissionLevel,
    },

    /// Infrastructure failure while resolving the identity
    #[error("Identity resolution failed: {0}")]
    Resolution(#[source] ResolutionError),
}

impl AuthError {
    /// Audit reason code for this rejection.
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::Validation { .. } => ReasonCode::ValidationError,
            Self::ExpiredTimestamp { .. } => ReasonCode::ExpiredTimestamp,
            Self::ReplayedNonce { .. } => ReasonCode::ReplayedNonce,
            Self::InvalidSignature => ReasonCode::InvalidSignature,
            Self::InsufficientPermission { .. } => ReasonCode::InsufficientPermission,
            Self::Resolution(_) => ReasonCode::ResolutionError,
        }
    }
}

impl From<ResolutionError> for AuthError {
    /// An identity without key material cannot produce a valid signature, so
    /// it is reported as such. Only resolver faults keep their own reason.
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::UnknownIdentity(_) | ResolutionError::InvalidKey { .. } => {
                Self::InvalidSignature
            }
            other @ ResolutionError::Unavailable(_) => Self::Resolution(other),
        }
    }
}
