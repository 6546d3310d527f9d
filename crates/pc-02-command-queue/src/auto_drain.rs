//! # Auto-Drain
//!
//! Background task that drains the queue whenever the link is up.
//!
//! - A transition into `Connected` drains immediately and arms a periodic
//!   timer
//! - Leaving `Connected` disarms the timer. A pass already running is allowed
//!   to finish
//! - Shutdown is checked before every pass

use crate::ports::inbound::CommandQueueApi;
use shared_types::ConnectionState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Handle to a running auto-drain task.
pub struct AutoDrainHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AutoDrainHandle {
    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Auto-drain task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the auto-drain loop for `queue`, driven by `connection`.
pub fn spawn_auto_drain<Q>(
    queue: Arc<Q>,
    mut connection: watch::Receiver<ConnectionState>,
    interval: Duration,
) -> AutoDrainHandle
where
    Q: CommandQueueApi + ?Sized + 'static,
{
    let (shutdown_tx, mut shutdown) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut connected = connection.borrow_and_update().is_connected();
        if connected {
            drain(queue.as_ref()).await;
            ticker.reset();
        }

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                changed = connection.changed() => {
                    if changed.is_err() {
                        info!("Connection watch closed, stopping auto-drain");
                        break;
                    }
                    let state = *connection.borrow_and_update();
                    match (connected, state.is_connected()) {
                        (false, true) => {
                            info!("Link connected, draining command queue");
                            connected = true;
                            drain(queue.as_ref()).await;
                            ticker.reset();
                        }
                        (true, false) => {
                            info!(%state, "Link lost, pausing auto-drain");
                            connected = false;
                        }
                        _ => {}
                    }
                }
                _ = ticker.tick(), if connected => {
                    if *shutdown.borrow() {
                        break;
                    }
                    drain(queue.as_ref()).await;
                }
            }
        }
        debug!("Auto-drain stopped");
    });

    AutoDrainHandle {
        shutdown: shutdown_tx,
        task,
    }
}

async fn drain<Q: CommandQueueApi + ?Sized>(queue: &Q) {
    match queue.dequeue_and_send().await {
        Ok(0) => {}
        Ok(delivered) => debug!(delivered, "Auto-drain delivered commands"),
        Err(e) => error!(error = %e, "Auto-drain pass failed"),
    }
}
