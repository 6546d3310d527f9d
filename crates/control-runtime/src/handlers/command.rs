//! # Peer Command Handler
//!
//! Peer-side endpoint of the loopback link. Every command passes the auth
//! gate before any method runs.
//!
//! ```text
//! LoopbackTransport ──execute──→ PeerCommandHandler
//!                                     │
//!                                     │ AuthGate::verify(request, method)
//!                                     ▼
//!                          denied ──→ Rejected("unauthorized")
//!                          granted ─→ run method, emit notifications
//! ```
//!
//! | Method | Result | Notifications |
//! |--------|--------|---------------|
//! | `system.ping` | `{pong, timestamp}` | - |
//! | `system.echo` | the params | - |
//! | `system.status` | `{uptimeMs, executed}` | - |
//! | `workflow.start` | `{workflowId, status}` | `workflow.progress`, `workflow.completed` |

use crate::adapters::loopback::PeerEndpoint;
use async_trait::async_trait;
use pc_01_auth_gate::AuthGateApi;
use pc_02_command_queue::TransportError;
use serde_json::{json, Value};
use shared_types::{current_timestamp_ms, EventNotification, Params, SignedRequest};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub struct PeerCommandHandler<G> {
    gate: Arc<G>,
    events: broadcast::Sender<EventNotification>,
    started: Instant,
    executed: AtomicU64,
}

impl<G: AuthGateApi> PeerCommandHandler<G> {
    pub fn new(gate: Arc<G>, events: broadcast::Sender<EventNotification>) -> Self {
        Self {
            gate,
            events,
            started: Instant::now(),
            executed: AtomicU64::new(0),
        }
    }

    /// Commands that passed the gate and ran.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    fn run(&self, method: &str, params: &Params) -> Result<Value, TransportError> {
        match method {
            "system.ping" => Ok(json!({ "pong": true, "timestamp": current_timestamp_ms() })),
            "system.echo" => Ok(Value::Object(params.clone())),
            "system.status" => Ok(json!({
                "uptimeMs": u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "executed": self.executed(),
            })),
            "workflow.start" => self.start_workflow(params),
            other => Err(TransportError::Rejected(format!("unknown method: {other}"))),
        }
    }

    fn start_workflow(&self, params: &Params) -> Result<Value, TransportError> {
        let workflow_id = params
            .get("workflowId")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Rejected("workflow.start requires workflowId".to_string()))?;

        for (method, progress) in [("workflow.progress", 50), ("workflow.progress", 100)] {
            self.publish(method, json!({ "workflowId": workflow_id, "progress": progress }));
        }
        self.publish("workflow.completed", json!({ "workflowId": workflow_id }));

        Ok(json!({ "workflowId": workflow_id, "status": "completed" }))
    }

    fn publish(&self, method: &str, params: Value) {
        let params = match params {
            Value::Object(map) => map,
            _ => Params::new(),
        };
        // Nobody listening is fine
        let _ = self.events.send(EventNotification::new(method, params));
    }
}

#[async_trait]
impl<G: AuthGateApi> PeerEndpoint for PeerCommandHandler<G> {
    async fn execute(
        &self,
        method: &str,
        params: &Params,
        request: &SignedRequest,
    ) -> Result<Value, TransportError> {
        if !self.gate.verify(request, method).await {
            warn!(identity = %request.identity(), method, "Peer refused command");
            return Err(TransportError::Rejected("unauthorized".to_string()));
        }

        let result = self.run(method, params)?;
        self.executed.fetch_add(1, Ordering::Relaxed);
        debug!(identity = %request.identity(), method, "Peer executed command");
        Ok(result)
    }
}
