//! # `SignedRequest` Envelope
//!
//! The wrapper every controller command travels in.
//!
//! ## Security Properties
//!
//! - **Identity**: `identity` is the DID the signature is checked against.
//! - **Time-Bounded Replay Prevention**: `timestamp` and `nonce` bound how long
//!   and how often a signature is usable.
//! - **Method Binding**: the signature covers the method the verifier expects,
//!   not a value read from this envelope (see `security::canonical_payload`).

use crate::entities::Params;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// A signed controller command.
///
/// Fields absent on the wire deserialize to empty values; the auth gate then
/// rejects the request as incomplete instead of the decoder failing.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedRequest {
    identity: String,
    method: String,
    params: Params,
    #[serde_as(as = "Base64")]
    signature: Vec<u8>,
    timestamp: u64,
    nonce: String,
}

impl SignedRequest {
    /// Assemble a request from already-computed parts.
    pub fn new(
        identity: impl Into<String>,
        method: impl Into<String>,
        params: Params,
        signature: Vec<u8>,
        timestamp: u64,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            method: method.into(),
            params,
            signature,
            timestamp,
            nonce: nonce.into(),
        }
    }

    /// Signer identity (DID).
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Method the controller claims to invoke. Informational only.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Command parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Detached signature bytes.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Creation time in epoch milliseconds.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Single-use token.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Ledger key for this request's (identity, nonce) pair.
    #[must_use]
    pub fn nonce_key(&self) -> String {
        format!("{}:{}", self.identity, self.nonce)
    }
}
