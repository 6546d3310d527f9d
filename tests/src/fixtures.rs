//! # Shared Fixtures
//!
//! A peer on a manual clock, reachable over a loopback link, plus helpers to
//! put raw envelopes on that link the way an attacker would.

use control_runtime::adapters::{LoopbackTransport, PeerEndpoint};
use control_runtime::handlers::PeerCommandHandler;
use pc_01_auth_gate::{
    AuthGate, AuthGateConfig, PermissionLevel, PermissionTable, RequestSigner,
    StaticIdentityResolver,
};
use pc_02_command_queue::{CommandTransport, DispatchedCommand, TransportError};
use serde_json::Value;
use shared_types::{current_timestamp_ms, ManualClock, Params, SignedRequest, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Fixed start time for manual clocks (2023-11-14T22:13:20Z).
pub const T0: u64 = 1_700_000_000_000;

pub const CONTROLLER: &str = "did:key:controller";
pub const OPERATOR: &str = "did:key:operator";

pub type TestGate = AuthGate<Arc<StaticIdentityResolver>, Arc<PermissionTable>, Arc<ManualClock>>;

pub struct PeerFixture {
    pub gate: Arc<TestGate>,
    pub keys: Arc<StaticIdentityResolver>,
    pub permissions: Arc<PermissionTable>,
    pub clock: Arc<ManualClock>,
    pub peer: Arc<PeerCommandHandler<TestGate>>,
    pub link: Arc<LoopbackTransport>,
    /// Trusted at `Admin`.
    pub controller: RequestSigner,
    /// Trusted at `User`.
    pub operator: RequestSigner,
}

impl PeerFixture {
    /// A connected peer with the default method table:
    /// `system.ping` Public, `system`/`workflow` User, everything else Admin.
    pub fn new() -> Self {
        Self::at(T0)
    }

    /// Same as [`new`](Self::new) but starting at wall-clock time, for flows
    /// where the envelope is signed by a `RequestSigner` using the real clock.
    pub fn live() -> Self {
        Self::at(current_timestamp_ms())
    }

    fn at(start_ms: u64) -> Self {
        let clock = Arc::new(ManualClock::new(start_ms));
        let controller = RequestSigner::from_seed(CONTROLLER, [1u8; 32]);
        let operator = RequestSigner::from_seed(OPERATOR, [2u8; 32]);

        let keys = Arc::new(StaticIdentityResolver::new());
        keys.register(controller.identity(), controller.public_key());
        keys.register(operator.identity(), operator.public_key());

        let permissions = Arc::new(
            PermissionTable::new()
                .with_method_level("system.ping", PermissionLevel::Public)
                .with_method_level("system", PermissionLevel::User)
                .with_method_level("workflow", PermissionLevel::User)
                .with_identity_level(CONTROLLER, PermissionLevel::Admin)
                .with_identity_level(OPERATOR, PermissionLevel::User),
        );

        let gate = Arc::new(AuthGate::with_clock(
            AuthGateConfig::default(),
            Arc::clone(&keys),
            Arc::clone(&permissions),
            Arc::clone(&clock),
        ));

        let (events, _) = broadcast::channel(64);
        let peer = Arc::new(PeerCommandHandler::new(Arc::clone(&gate), events.clone()));
        let endpoint: Arc<dyn PeerEndpoint> = peer.clone();
        let link = Arc::new(LoopbackTransport::new(endpoint, events));
        link.connect();

        Self {
            gate,
            keys,
            permissions,
            clock,
            peer,
            link,
            controller,
            operator,
        }
    }

    /// Sign `method` as `signer` at the fixture's current time.
    pub fn sign(&self, signer: &RequestSigner, method: &str, nonce: &str) -> SignedRequest {
        signer.sign_at(method, Params::new(), self.clock.now_ms(), nonce)
    }

    /// Put `envelope` on the link as an invocation of `method`.
    pub async fn deliver(&self, method: &str, envelope: &SignedRequest) -> Result<Value, TransportError> {
        self.link.send(&raw_command(method, envelope)).await
    }
}

impl Default for PeerFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A wire command carrying `envelope` verbatim.
pub fn raw_command(method: &str, envelope: &SignedRequest) -> DispatchedCommand {
    DispatchedCommand {
        id: 0,
        method: method.to_string(),
        params: Params::new(),
        auth: serde_json::to_value(envelope).ok(),
    }
}

pub fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

pub fn unauthorized() -> TransportError {
    TransportError::Rejected("unauthorized".to_string())
}

/// Poll `condition` every 5ms for up to 2s.
pub async fn eventually<F: FnMut() -> bool>(mut condition: F) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
