//! # Outbound Ports (Driven Ports / SPI)
//!
//! Collaborators the gate depends on.

use crate::domain::entities::PermissionLevel;
use crate::domain::errors::ResolutionError;
use crate::domain::permissions::PermissionTable;
use crate::domain::signature::PublicKey;
use async_trait::async_trait;
use std::sync::Arc;

/// Maps an identity (DID) to its verification key.
///
/// The only awaited collaborator of the gate. Implementations may cache.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// # Errors
    /// * `ResolutionError::UnknownIdentity` - no key is registered
    /// * `ResolutionError::Unavailable` - the backing source could not answer
    async fn resolve(&self, identity: &str) -> Result<PublicKey, ResolutionError>;
}

#[async_trait]
impl<T: IdentityResolver + ?Sized> IdentityResolver for Arc<T> {
    async fn resolve(&self, identity: &str) -> Result<PublicKey, ResolutionError> {
        (**self).resolve(identity).await
    }
}

/// Source of required and granted permission levels.
pub trait PermissionPolicy: Send + Sync {
    fn required_level(&self, method: &str) -> PermissionLevel;
    fn granted_level(&self, identity: &str) -> PermissionLevel;
}

impl PermissionPolicy for PermissionTable {
    fn required_level(&self, method: &str) -> PermissionLevel {
        PermissionTable::required_level(self, method)
    }

    fn granted_level(&self, identity: &str) -> PermissionLevel {
        PermissionTable::granted_level(self, identity)
    }
}

impl<T: PermissionPolicy + ?Sized> PermissionPolicy for Arc<T> {
    fn required_level(&self, method: &str) -> PermissionLevel {
        (**self).required_level(method)
    }

    fn granted_level(&self, identity: &str) -> PermissionLevel {
        (**self).granted_level(identity)
    }
}
