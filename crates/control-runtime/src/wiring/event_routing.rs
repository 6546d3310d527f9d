//! # Event Routing
//!
//! Subscriptions the runtime registers on its own router.

use crate::container::config::PresetSubscription;
use pc_03_event_router::{handler_fn, EventRouter, SubscriptionId};
use shared_types::Params;
use tracing::{info, warn};

/// Log connectivity notifications, workflow completions and every configured
/// preset stream.
pub fn install_default_subscriptions(
    router: &EventRouter,
    log_presets: &[PresetSubscription],
) -> Vec<SubscriptionId> {
    let connectivity = router.on_connectivity_change(handler_fn(|event| {
        info!(method = %event.method, "Peer connectivity changed");
        Ok(())
    }));

    let workflows = router.subscribe(
        ["workflow.completed", "workflow.failed"],
        Params::new(),
        handler_fn(|event| {
            let workflow_id = event
                .param("workflowId")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            info!(method = %event.method, workflow_id, "Peer workflow finished");
            Ok(())
        }),
    );

    let mut ids = vec![connectivity, workflows];
    for subscription in log_presets {
        let preset = subscription.preset.clone();
        let handler = handler_fn(move |event| {
            info!(preset = %preset, method = %event.method, params = ?event.params, "Peer event");
            Ok(())
        });
        match router.subscribe_named(&subscription.preset, subscription.scope.clone(), handler) {
            Some(id) => ids.push(id),
            None => warn!(preset = %subscription.preset, "Unknown event preset, not subscribed"),
        }
    }
    ids
}
