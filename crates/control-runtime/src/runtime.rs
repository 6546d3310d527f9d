//! # Control Runtime
//!
//! ## Startup Sequence
//!
//! 1. Recover rows left in `sending` by a previous run
//! 2. Drop rows older than `queue.max_age_ms`
//! 3. Install the runtime's own router subscriptions
//! 4. Spawn the nonce sweeper, metrics feeds and the router loop
//! 5. Spawn auto-drain on the transport's connection watch
//!
//! ## Shutdown Sequence
//!
//! 1. Signal shutdown to every task
//! 2. Stop auto-drain, letting an in-flight pass finish
//! 3. Join the remaining tasks

use crate::container::{ComponentContainer, ControlConfig};
use crate::wiring::{
    install_default_subscriptions, metered_events, spawn_audit_metrics, spawn_queue_sampler,
};
use anyhow::{bail, Context, Result};
use parking_lot::Mutex;
use pc_02_command_queue::{
    spawn_auto_drain, AutoDrainHandle, CommandId, CommandQueueApi, OutboundCommand, QueueError,
};
use shared_types::Params;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct ControlRuntime {
    config: ControlConfig,
    container: ComponentContainer,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    auto_drain: Mutex<Option<AutoDrainHandle>>,
}

impl ControlRuntime {
    /// Validate `config` and build every component. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(config: ControlConfig) -> Result<Self> {
        config.validate().context("invalid configuration")?;
        let container = ComponentContainer::build(&config).context("building components")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            auto_drain: Mutex::new(None),
        })
    }

    pub async fn start(&self) -> Result<()> {
        if self.auto_drain.lock().is_some() {
            bail!("runtime already started");
        }
        let c = &self.container;
        info!(controller = %c.controller_identity(), "Starting control runtime");

        let recovered = c
            .queue
            .inner()
            .recover_interrupted()
            .await
            .context("recovering interrupted commands")?;
        let expired = c
            .queue
            .cleanup_old_commands(self.config.queue.max_age_ms)
            .await
            .context("removing expired commands")?;
        if recovered > 0 || expired > 0 {
            info!(recovered, expired, "Queue housekeeping done");
        }

        install_default_subscriptions(&c.router, &self.config.router.log_presets);

        let tasks = vec![
            c.gate.spawn_nonce_sweeper(
                Duration::from_millis(self.config.security.sweep_interval_ms),
                self.shutdown_rx.clone(),
            ),
            spawn_audit_metrics(c.gate.audit_handle(), self.shutdown_rx.clone()),
            spawn_queue_sampler(
                Arc::clone(&c.queue),
                Duration::from_millis(self.config.queue.stats_interval_ms),
                self.shutdown_rx.clone(),
            ),
            c.router
                .spawn(metered_events(c.transport.events()), self.shutdown_rx.clone()),
        ];
        self.tasks.lock().extend(tasks);

        let drain = spawn_auto_drain(
            Arc::clone(&c.queue),
            c.transport.connection(),
            Duration::from_millis(self.config.queue.policy.drain_interval_ms),
        );
        *self.auto_drain.lock() = Some(drain);

        info!("Control runtime started");
        Ok(())
    }

    /// Queue `method` for delivery. It is signed when sent.
    ///
    /// While the link is up a drain pass is started right away; otherwise the
    /// command waits for the next connect.
    pub async fn submit(&self, method: &str, params: Params) -> Result<CommandId, QueueError> {
        let id = self
            .container
            .queue
            .enqueue(OutboundCommand::new(method, params))
            .await?;

        let running = self.auto_drain.lock().is_some();
        if running && self.container.transport.state().is_connected() {
            let queue = Arc::clone(&self.container.queue);
            let drain = tokio::spawn(async move {
                if let Err(e) = queue.dequeue_and_send().await {
                    warn!(error = %e, "Drain after submit failed");
                }
            });
            let mut tasks = self.tasks.lock();
            tasks.retain(|task| !task.is_finished());
            tasks.push(drain);
        }
        Ok(id)
    }

    pub fn connect(&self) {
        self.container.transport.connect();
    }

    pub fn disconnect(&self) {
        self.container.transport.disconnect();
    }

    pub fn container(&self) -> &ComponentContainer {
        &self.container
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let drain = self.auto_drain.lock().take();
        if let Some(drain) = drain {
            drain.shutdown().await;
        }

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Runtime task ended abnormally");
            }
        }

        info!("Shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pc_01_auth_gate::AuthGateApi;
    use pc_03_event_router::handler_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_queued_command_delivered_on_connect() {
        let runtime = ControlRuntime::new(ControlConfig::default()).unwrap();
        runtime.start().await.unwrap();

        runtime.submit("system.ping", Params::new()).await.unwrap();
        assert_eq!(runtime.container().queue.stats().await.unwrap().pending, 1);

        runtime.connect();
        let peer = Arc::clone(&runtime.container().peer);
        wait_for(|| peer.executed() == 1).await;

        let mut remaining = usize::MAX;
        for _ in 0..200 {
            remaining = runtime.container().queue.stats().await.unwrap().total;
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(remaining, 0);
        let audit = runtime.container().gate.audit_log().last().unwrap();
        assert!(audit.granted);
        assert_eq!(audit.method, "system.ping");

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_peer_events_reach_subscribers() {
        let runtime = ControlRuntime::new(ControlConfig::default()).unwrap();
        runtime.start().await.unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        runtime.container().router.on_workflow_progress(
            "wf-9",
            handler_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let mut params = Params::new();
        params.insert("workflowId".into(), "wf-9".into());
        runtime.submit("workflow.start", params).await.unwrap();
        runtime.connect();

        wait_for(|| seen.load(Ordering::SeqCst) == 3).await;
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_submitted_drain() {
        let runtime = ControlRuntime::new(ControlConfig::default()).unwrap();
        runtime.start().await.unwrap();
        runtime.connect();
        // Let the connect-triggered pass over the empty queue finish
        tokio::time::sleep(Duration::from_millis(20)).await;

        runtime.container().transport.set_latency(Duration::from_millis(100));
        runtime.submit("system.ping", Params::new()).await.unwrap();
        runtime.shutdown().await;

        assert_eq!(runtime.container().peer.executed(), 1);
        assert_eq!(runtime.container().queue.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let runtime = ControlRuntime::new(ControlConfig::default()).unwrap();
        runtime.start().await.unwrap();
        assert!(runtime.start().await.is_err());
        runtime.shutdown().await;
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ControlConfig::default();
        config.security.nonce_retention_ms = 1;
        assert!(ControlRuntime::new(config).is_err());
    }
}
