//! # Runtime Wiring
//!
//! Connects component outputs to telemetry and installs the runtime's own
//! subscriptions.
//!
//! ```text
//! AuditLog::subscribe ──────────→ pc_auth_decisions_total{outcome,reason}
//! CommandQueue::stats (sampled) ─→ pc_queue_commands{status}
//! MeteredQueue drains ───────────→ pc_queue_drained_total
//! transport events ──inspect────→ pc_router_events_total{category} ──→ EventRouter
//! ```

pub mod event_routing;
pub mod metrics;

pub use event_routing::install_default_subscriptions;
pub use metrics::{metered_events, spawn_audit_metrics, spawn_queue_sampler, MeteredQueue};
