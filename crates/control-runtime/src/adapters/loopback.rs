//! # Loopback Transport
//!
//! Stands in for the P2P link. Commands are handed straight to a local
//! [`PeerEndpoint`]; notifications the peer emits come back through
//! [`LoopbackTransport::events`].

use async_trait::async_trait;
use futures::Stream;
use parking_lot::Mutex;
use pc_02_command_queue::{CommandTransport, DispatchedCommand, TransportError};
use serde_json::Value;
use shared_types::{ConnectionState, EventNotification, Params, SignedRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// The receiving side of the link.
#[async_trait]
pub trait PeerEndpoint: Send + Sync {
    /// Run `method` with `params` on behalf of the signer of `request`.
    async fn execute(
        &self,
        method: &str,
        params: &Params,
        request: &SignedRequest,
    ) -> Result<Value, TransportError>;
}

pub struct LoopbackTransport {
    peer: Arc<dyn PeerEndpoint>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<EventNotification>,
    latency: Mutex<Duration>,
}

impl LoopbackTransport {
    /// Create a disconnected link to `peer`. `events` is the channel the peer
    /// publishes notifications on.
    pub fn new(peer: Arc<dyn PeerEndpoint>, events: broadcast::Sender<EventNotification>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            peer,
            state,
            events,
            latency: Mutex::new(Duration::ZERO),
        }
    }

    pub fn connect(&self) {
        self.set_state(ConnectionState::Connected);
    }

    pub fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
    }

    pub fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!(from = %previous, to = %state, "Loopback link state changed");
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch of the link state.
    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Delay applied to every send.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Publish a notification as if the peer had pushed it.
    pub fn emit(&self, event: EventNotification) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Notifications emitted from now on. A subscriber that falls behind
    /// skips the events it missed.
    pub fn events(&self) -> impl Stream<Item = EventNotification> + Send + Unpin + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "Event stream lagged, notifications dropped");
                None
            }
        })
    }
}

#[async_trait]
impl CommandTransport for LoopbackTransport {
    async fn send(&self, command: &DispatchedCommand) -> Result<Value, TransportError> {
        if !self.state().is_connected() {
            return Err(TransportError::NotConnected);
        }

        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let auth = command
            .auth
            .as_ref()
            .ok_or_else(|| TransportError::Rejected("missing auth envelope".to_string()))?;
        let request: SignedRequest = serde_json::from_value(auth.clone())
            .map_err(|e| TransportError::Rejected(format!("malformed auth envelope: {e}")))?;

        debug!(id = command.id, method = %command.method, "Delivering command over loopback");
        self.peer
            .execute(&command.method, &command.params, &request)
            .await
    }
}
