//! # Auth Gate Service
//!
//! Application service implementing `AuthGateApi`.
//!
//! ## Verification Order
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! | Step | Check | Rejection | Nonce consumed |
//! |------|-------|-----------|----------------|
//! | 1 | identity, signature, timestamp, nonce present | `ValidationError` | no |
//! | 2 | `abs(now - timestamp) <= window` | `ExpiredTimestamp` | no |
//! | 3 | `identity:nonce` unused | `ReplayedNonce` | - |
//! | 4 | Ed25519 over `{method, nonce, timestamp}` | `InvalidSignature` / `ResolutionError` | yes |
//! | 5 | granted level >= required level | `InsufficientPermission` | yes |
//!
//! Every outcome, granted or not, is appended to the audit log.

use crate::domain::audit::{AuditLog, DEFAULT_AUDIT_CAPACITY};
use crate::domain::entities::{AuditLogEntry, ReasonCode};
use crate::domain::errors::AuthError;
use crate::domain::nonce_ledger::{NonceLedger, DEFAULT_MAX_LEDGER_ENTRIES};
use crate::ports::inbound::AuthGateApi;
use crate::ports::outbound::{IdentityResolver, PermissionPolicy};
use async_trait::async_trait;
use shared_types::{
    canonical_payload, SignedRequest, SystemTimeSource, TimeSource, DEFAULT_FRESHNESS_WINDOW_MS,
    DEFAULT_NONCE_RETENTION_MS,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Auth gate tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGateConfig {
    /// Maximum allowed `abs(now - timestamp)`.
    pub freshness_window_ms: u64,
    /// How long a consumed nonce stays rejected.
    pub nonce_retention_ms: u64,
    pub max_ledger_entries: usize,
    /// Number of decisions retained by the audit log.
    pub audit_capacity: usize,
}

impl Default for AuthGateConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            nonce_retention_ms: DEFAULT_NONCE_RETENTION_MS,
            max_ledger_entries: DEFAULT_MAX_LEDGER_ENTRIES,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

/// Verifies signed requests before any handler executes.
pub struct AuthGate<R, P, C = SystemTimeSource> {
    config: AuthGateConfig,
    ledger: NonceLedger,
    resolver: R,
    permissions: P,
    audit: Arc<AuditLog>,
    clock: C,
}

impl<R, P> AuthGate<R, P, SystemTimeSource>
where
    R: IdentityResolver,
    P: PermissionPolicy,
{
    /// Create a gate using the wall clock.
    pub fn new(config: AuthGateConfig, resolver: R, permissions: P) -> Self {
        Self::with_clock(config, resolver, permissions, SystemTimeSource)
    }
}

impl<R, P, C> AuthGate<R, P, C>
where
    R: IdentityResolver,
    P: PermissionPolicy,
    C: TimeSource,
{
    /// Create a gate with an explicit time source.
    pub fn with_clock(config: AuthGateConfig, resolver: R, permissions: P, clock: C) -> Self {
        let ledger = NonceLedger::new(config.nonce_retention_ms, config.max_ledger_entries);
        let audit = Arc::new(AuditLog::with_capacity(config.audit_capacity));
        Self {
            config,
            ledger,
            resolver,
            permissions,
            audit,
            clock,
        }
    }

    pub fn config(&self) -> &AuthGateConfig {
        &self.config
    }

    pub fn ledger(&self) -> &NonceLedger {
        &self.ledger
    }

    /// Shared handle to the audit log, for readers that outlive a borrow.
    pub fn audit_handle(&self) -> Arc<AuditLog> {
        Arc::clone(&self.audit)
    }

    /// Drop expired nonces. Returns how many were removed.
    pub fn sweep_nonces(&self) -> usize {
        self.ledger.sweep(self.clock.now_ms())
    }

    async fn evaluate(
        &self,
        request: &SignedRequest,
        required_method: &str,
        now: u64,
    ) -> Result<(), AuthError> {
        // Step 1: completeness
        if request.identity().is_empty() {
            return Err(AuthError::Validation { missing: "identity" });
        }
        if request.signature().is_empty() {
            return Err(AuthError::Validation { missing: "signature" });
        }
        if request.timestamp() == 0 {
            return Err(AuthError::Validation { missing: "timestamp" });
        }
        if request.nonce().is_empty() {
            return Err(AuthError::Validation { missing: "nonce" });
        }

        // Step 2: freshness, symmetric around now
        let window_ms = self.config.freshness_window_ms;
        if now.abs_diff(request.timestamp()) > window_ms {
            return Err(AuthError::ExpiredTimestamp {
                timestamp: request.timestamp(),
                now,
                window_ms,
            });
        }

        // Step 3: replay check. Consumes the nonce even if later steps fail.
        let key = request.nonce_key();
        if !self.ledger.check_and_insert(&key, now) {
            return Err(AuthError::ReplayedNonce { key });
        }

        // Step 4: signature over the method being executed
        let public_key = self.resolver.resolve(request.identity()).await?;
        let payload = canonical_payload(required_method, request.timestamp(), request.nonce());
        public_key
            .verify_detached(&payload, request.signature())
            .map_err(|_| AuthError::InvalidSignature)?;

        // Step 5: authorization
        let required = self.permissions.required_level(required_method);
        let granted = self.permissions.granted_level(request.identity());
        if !granted.allows(required) {
            return Err(AuthError::InsufficientPermission { required, granted });
        }

        Ok(())
    }

    /// Spawn a task that sweeps the ledger every `interval` until `shutdown`
    /// flips to `true` or its sender is dropped.
    pub fn spawn_nonce_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()>
    where
        R: 'static,
        P: 'static,
        C: 'static,
    {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = gate.sweep_nonces();
                        if removed > 0 {
                            debug!(removed, remaining = gate.ledger.len(), "Swept expired nonces");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Nonce sweeper stopped");
        })
    }
}

#[async_trait]
impl<R, P, C> AuthGateApi for AuthGate<R, P, C>
where
    R: IdentityResolver,
    P: PermissionPolicy,
    C: TimeSource,
{
    async fn verify(&self, request: &SignedRequest, required_method: &str) -> bool {
        let now = self.clock.now_ms();
        let outcome = self.evaluate(request, required_method, now).await;

        let reason = match &outcome {
            Ok(()) => {
                debug!(identity = %request.identity(), method = %required_method, "Request granted");
                ReasonCode::Granted
            }
            Err(err @ AuthError::Resolution(_)) => {
                error!(identity = %request.identity(), method = %required_method, error = %err, "Identity resolution failed");
                err.reason()
            }
            Err(err) => {
                warn!(
                    identity = %request.identity(),
                    method = %required_method,
                    reason = err.reason().as_str(),
                    error = %err,
                    "Request rejected"
                );
                err.reason()
            }
        };

        self.audit.append(AuditLogEntry {
            identity: request.identity().to_owned(),
            method: required_method.to_owned(),
            granted: outcome.is_ok(),
            reason,
            timestamp: now,
        });

        outcome.is_ok()
    }

    fn audit_log(&self) -> &AuditLog {
        &self.audit
    }
}
