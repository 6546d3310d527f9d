//! Prometheus metrics for the control channel.
//!
//! All metrics follow the naming convention: `pc_<component>_<metric>`
//!
//! ## Metric Types
//!
//! - **Counter**: authorization decisions, drained commands, routed events
//! - **Gauge**: queue rows per status

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Metrics registry for this process
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // AUTH GATE METRICS (PC-01)
    // =========================================================================

    /// Authorization decisions by outcome and reason code
    pub static ref AUTH_DECISIONS: CounterVec = CounterVec::new(
        Opts::new("pc_auth_decisions_total", "Total authorization decisions"),
        &["outcome", "reason"]  // outcome: granted/denied
    ).expect("metric creation failed");

    // =========================================================================
    // COMMAND QUEUE METRICS (PC-02)
    // =========================================================================

    /// Persisted queue rows by status
    pub static ref QUEUE_COMMANDS: GaugeVec = GaugeVec::new(
        Opts::new("pc_queue_commands", "Queued commands by status"),
        &["status"]
    ).expect("metric creation failed");

    /// Commands confirmed delivered by a drain pass
    pub static ref QUEUE_DRAINED: Counter = Counter::new(
        "pc_queue_drained_total",
        "Total commands delivered by the command queue"
    ).expect("metric creation failed");

    // =========================================================================
    // EVENT ROUTER METRICS (PC-03)
    // =========================================================================

    /// Inbound events by category (`none` when unclassified)
    pub static ref ROUTER_EVENTS: CounterVec = CounterVec::new(
        Opts::new("pc_router_events_total", "Total inbound events by category"),
        &["category"]
    ).expect("metric creation failed");
}

/// Keeps the registry alive for the lifetime of the telemetry guard.
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(AUTH_DECISIONS.clone()),
        Box::new(QUEUE_COMMANDS.clone()),
        Box::new(QUEUE_DRAINED.clone()),
        Box::new(ROUTER_EVENTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Render every registered metric in the text exposition format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

pub fn record_auth_decision(granted: bool, reason: &str) {
    let outcome = if granted { "granted" } else { "denied" };
    AUTH_DECISIONS.with_label_values(&[outcome, reason]).inc();
}

pub fn set_queue_depth(status: &str, rows: usize) {
    QUEUE_COMMANDS.with_label_values(&[status]).set(rows as f64);
}

pub fn record_drained(delivered: usize) {
    QUEUE_DRAINED.inc_by(delivered as f64);
}

pub fn record_router_event(category: Option<&str>) {
    ROUTER_EVENTS
        .with_label_values(&[category.unwrap_or("none")])
        .inc();
}
