//! # Inbound Ports (Driving Ports / API)
//!
//! What the peer's command dispatcher calls before running any handler.

use crate::domain::audit::AuditLog;
use async_trait::async_trait;
use shared_types::SignedRequest;

/// Primary auth gate API.
#[async_trait]
pub trait AuthGateApi: Send + Sync {
    /// Decide whether `request` may invoke `required_method`.
    ///
    /// `required_method` is what the dispatcher is about to execute; the
    /// signature must cover it. The rejection reason is only recorded in the
    /// audit log.
    async fn verify(&self, request: &SignedRequest, required_method: &str) -> bool;

    /// Read-only view of past decisions.
    fn audit_log(&self) -> &AuditLog;
}
