//! # Ed25519 Request Signatures
//!
//! Verification on the peer side and signing on the controller side. Both
//! sides sign `canonical_payload(method, timestamp, nonce)`.

use crate::domain::errors::CryptoError;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use shared_types::{canonical_payload, current_timestamp_ms, Params, SignedRequest};
use uuid::Uuid;

pub const PUBLIC_KEY_LENGTH: usize = 32;
pub const SIGNATURE_LENGTH: usize = 64;

/// Ed25519 public key material for an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    /// Create from bytes, rejecting values that are not curve points.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_LENGTH]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array = <[u8; PUBLIC_KEY_LENGTH]>::try_from(bytes).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LENGTH,
                actual: bytes.len(),
            }
        })?;
        Self::from_bytes(array)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// Verify a detached signature over `message`.
    ///
    /// Uses strict verification, so small-order keys and non-canonical
    /// signatures are rejected.
    pub fn verify_detached(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let sig_bytes = <[u8; SIGNATURE_LENGTH]>::try_from(signature)
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        verifying_key
            .verify_strict(message, &Signature::from_bytes(&sig_bytes))
            .map_err(|_| CryptoError::SignatureMismatch)
    }
}

/// Controller-side signer bound to one identity.
pub struct RequestSigner {
    identity: String,
    signing_key: SigningKey,
}

impl RequestSigner {
    /// Generate a random key for `identity`.
    pub fn generate(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            signing_key: SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(identity: impl Into<String>, seed: [u8; 32]) -> Self {
        Self {
            identity: identity.into(),
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign arbitrary bytes.
    pub fn sign_bytes(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }

    /// Build a request for `method` with a fresh UUID nonce and the current
    /// time.
    pub fn sign(&self, method: &str, params: Params) -> SignedRequest {
        self.sign_at(method, params, current_timestamp_ms(), &Uuid::new_v4().to_string())
    }

    /// Build a request with an explicit timestamp and nonce.
    pub fn sign_at(&self, method: &str, params: Params, timestamp: u64, nonce: &str) -> SignedRequest {
        let signature = self.sign_bytes(&canonical_payload(method, timestamp, nonce));
        SignedRequest::new(
            self.identity.clone(),
            method,
            params,
            signature,
            timestamp,
            nonce,
        )
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("identity", &self.identity)
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
