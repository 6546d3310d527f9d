//! # Event Router
//!
//! Classifies inbound notifications into category streams and delivers them
//! to matching subscriptions.
//!
//! ## Dispatch
//!
//! ```text
//! notification ──classify──→ category stream (broadcast, lossy)
//!       │
//!       └──snapshot registry──→ for each matching subscription, in id order:
//!                                 handler.handle(event)  (errors + panics isolated)
//! ```
//!
//! Subscribing or unsubscribing during a dispatch does not affect the event
//! being delivered; it applies from the next event on.

use crate::domain::category::{classify, EventCategory};
use crate::domain::presets::{self, Preset};
use crate::domain::subscription::{SubscriptionId, SubscriptionSpec};
use crate::handler::{EventHandler, HandlerError};
use futures::{FutureExt, Stream, StreamExt};
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{EventNotification, Params};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default buffer per category stream.
pub const DEFAULT_STREAM_CAPACITY: usize = 256;

struct Registration {
    spec: SubscriptionSpec,
    handler: Arc<dyn EventHandler>,
}

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub category: Option<EventCategory>,
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

pub struct EventRouter {
    registry: RwLock<BTreeMap<SubscriptionId, Arc<Registration>>>,
    next_id: AtomicU64,
    streams: HashMap<EventCategory, broadcast::Sender<EventNotification>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_stream_capacity(DEFAULT_STREAM_CAPACITY)
    }

    pub fn with_stream_capacity(capacity: usize) -> Self {
        let streams = EventCategory::ALL
            .into_iter()
            .map(|category| (category, broadcast::channel(capacity.max(1)).0))
            .collect();
        Self {
            registry: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            streams,
        }
    }

    /// Register `handler` for events matching `event_types` and `filters`.
    pub fn subscribe<I, S>(
        &self,
        event_types: I,
        filters: Params,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscribe_spec(SubscriptionSpec::new(event_types).with_filters(filters), handler)
    }

    pub fn subscribe_spec(&self, spec: SubscriptionSpec, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(subscription_id = %id, event_types = ?spec.event_types, "Created subscription");
        self.registry
            .write()
            .insert(id, Arc::new(Registration { spec, handler }));
        id
    }

    /// Subscribe using a preset. See `domain::presets`.
    pub fn subscribe_preset(
        &self,
        preset: &Preset,
        scope: Option<Value>,
        handler: Arc<dyn EventHandler>,
    ) -> SubscriptionId {
        self.subscribe_spec(preset.spec(scope), handler)
    }

    /// Subscribe using a preset looked up by name. `None` if no preset has
    /// that name.
    pub fn subscribe_named(
        &self,
        preset: &str,
        scope: Option<Value>,
        handler: Arc<dyn EventHandler>,
    ) -> Option<SubscriptionId> {
        let preset = presets::find(preset)?;
        Some(self.subscribe_preset(preset, scope, handler))
    }

        pub fn on_connectivity_change(&self, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_preset(&presets::CONNECTIVITY, None, handler)
    }

    pub fn on_workflow_progress(&self, workflow_id: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_preset(&presets::WORKFLOW_PROGRESS, Some(Value::from(workflow_id)), handler)
    }

    pub fn on_file_transfer(&self, transfer_id: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_preset(&presets::FILE_TRANSFER, Some(Value::from(transfer_id)), handler)
    }

    pub fn on_ai_stream(&self, session_id: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_preset(&presets::AI_STREAM, Some(Value::from(session_id)), handler)
    }

    pub fn on_process_output(&self, pid: u64, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_preset(&presets::PROCESS_OUTPUT, Some(Value::from(pid)), handler)
    }

    pub fn on_tab_update(&self, tab_id: &str, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        self.subscribe_preset(&presets::BROWSER_TAB, Some(Value::from(tab_id)), handler)
    }

    /// Remove a subscription. Unknown ids are a no-op returning false.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.write().remove(&id).is_some();
        if removed {
            debug!(subscription_id = %id, "Removed subscription");
        }
        removed
    }

    /// Remove every subscription and return how many there were.
    pub fn unsubscribe_all(&self) -> usize {
        let mut registry = self.registry.write();
        let count = registry.len();
        registry.clear();
        count
    }

    pub fn subscription_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Receiver for every event classified into `category` from now on.
    pub fn category_stream(&self, category: EventCategory) -> broadcast::Receiver<EventNotification> {
        match self.streams.get(&category) {
            Some(tx) => tx.subscribe(),
            // Every category gets a sender in the constructor
            None => broadcast::channel(1).1,
        }
    }

    /// Classify and deliver one event.
    pub async fn dispatch(&self, event: &EventNotification) -> DispatchReport {
        let category = classify(&event.method);
        if let Some(tx) = category.and_then(|c| self.streams.get(&c)) {
            // No receivers is not an error
            let _ = tx.send(event.clone());
        }

        let snapshot: Vec<(SubscriptionId, Arc<Registration>)> = self
            .registry
            .read()
            .iter()
            .map(|(id, reg)| (*id, Arc::clone(reg)))
            .collect();

        let mut report = DispatchReport {
            category,
            ..DispatchReport::default()
        };

        for (id, registration) in snapshot {
            if !registration.spec.matches(event) {
                continue;
            }

            let outcome = AssertUnwindSafe(registration.handler.handle(event))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic.as_ref()))));

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(subscription_id = %id, method = %event.method, error = %e, "Subscriber failed");
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Pump `events` through `dispatch` in arrival order until the stream
    /// ends or `shutdown` flips to `true`.
    pub async fn run<St>(&self, mut events: St, mut shutdown: watch::Receiver<bool>)
    where
        St: Stream<Item = EventNotification> + Unpin,
    {
        info!("Event router started");
        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                next = events.next() => match next {
                    Some(event) => {
                        self.dispatch(&event).await;
                    }
                    None => {
                        info!("Event stream ended");
                        break;
                    }
                },
            }
        }
        info!("Event router stopped");
    }

    /// Spawn `run` on the current runtime.
    pub fn spawn<St>(self: &Arc<Self>, events: St, shutdown: watch::Receiver<bool>) -> JoinHandle<()>
    where
        St: Stream<Item = EventNotification> + Send + Unpin + 'static,
    {
        let router = Arc::clone(self);
        tokio::spawn(async move { router.run(events, shutdown).await })
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
