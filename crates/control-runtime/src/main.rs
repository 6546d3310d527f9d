//! # Peer Control Runtime
//!
//! Runs a controller against an in-process loopback peer until Ctrl+C.
//!
//! 1. Initialize telemetry (`PC_LOG_LEVEL`, `PC_JSON_LOGS`)
//! 2. Load configuration (`PC_CONFIG` file, then `PC_*` overrides)
//! 3. Build and start the runtime
//! 4. Bring the link up and queue a startup ping
//! 5. Wait for Ctrl+C, then shut down gracefully

use anyhow::{Context, Result};
use control_runtime::{ControlConfig, ControlRuntime};
use control_telemetry::{gather_metrics, init_telemetry, TelemetryConfig};
use shared_types::Params;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = init_telemetry(TelemetryConfig::from_env()).context("initializing telemetry")?;

    let config = ControlConfig::load().context("loading configuration")?;
    let runtime = ControlRuntime::new(config)?;
    runtime.start().await?;

    runtime.connect();
    let id = runtime
        .submit("system.ping", Params::new())
        .await
        .context("queueing startup ping")?;
    info!(id, "Queued startup ping");

    info!("Controller is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    if let Ok(metrics) = gather_metrics() {
        debug!(%metrics, "Final metrics");
    }
    drop(telemetry);

    Ok(())
}
