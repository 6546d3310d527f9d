//! # Event Streams
//!
//! Notifications emitted by the peer flow through the runtime's router into
//! category streams and subscriptions.

#[cfg(test)]
mod tests {
    use crate::fixtures::{eventually, params};
    use control_runtime::{ControlConfig, ControlRuntime};
    use pc_03_event_router::{handler_fn, EventCategory, HandlerError};
    use serde_json::json;
    use shared_types::EventNotification;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;

    fn counter() -> (Arc<AtomicUsize>, Arc<dyn pc_03_event_router::EventHandler>) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        let handler = handler_fn(move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (count, handler)
    }

    async fn running() -> ControlRuntime {
        let runtime = ControlRuntime::new(ControlConfig::default()).unwrap();
        runtime.start().await.unwrap();
        runtime.connect();
        runtime
    }

    #[tokio::test]
    async fn test_workflow_events_land_in_workflow_stream_only() {
        let runtime = running().await;
        let router = &runtime.container().router;
        let mut workflow = router.category_stream(EventCategory::Workflow);
        let mut ai = router.category_stream(EventCategory::Ai);

        runtime
            .submit("workflow.start", params(json!({ "workflowId": "wf-1" })))
            .await
            .unwrap();

        let mut methods = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(2), workflow.recv())
                .await
                .unwrap()
                .unwrap();
            methods.push(event.method);
        }
        assert_eq!(methods, vec!["workflow.progress", "workflow.progress", "workflow.completed"]);
        assert!(matches!(ai.try_recv(), Err(TryRecvError::Empty)));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_broken_subscribers_do_not_starve_others() {
        let runtime = running().await;
        let router = &runtime.container().router;

        router.subscribe(
            ["workflow"],
            Default::default(),
            handler_fn(|_| Err(HandlerError::failed("boom"))),
        );
        router.subscribe(
            ["workflow"],
            Default::default(),
            handler_fn(|_| panic!("subscriber bug")),
        );
        let (seen, handler) = counter();
        router.subscribe(["workflow"], Default::default(), handler);

        runtime
            .submit("workflow.start", params(json!({ "workflowId": "wf-2" })))
            .await
            .unwrap();
        assert!(eventually(|| seen.load(Ordering::SeqCst) == 3).await);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_filtered_subscription_ignores_other_workflows() {
        let runtime = running().await;
        let router = &runtime.container().router;

        let (mine, handler) = counter();
        router.on_workflow_progress("wf-mine", handler);
        let (all_done, handler) = counter();
        router.subscribe(["workflow.completed"], Default::default(), handler);

        for id in ["wf-other", "wf-mine"] {
            runtime
                .submit("workflow.start", params(json!({ "workflowId": id })))
                .await
                .unwrap();
        }

        assert!(eventually(|| all_done.load(Ordering::SeqCst) == 2).await);
        assert_eq!(mine.load(Ordering::SeqCst), 3);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unsubscribed_handler_stops_receiving() {
        let runtime = running().await;
        let router = &runtime.container().router;

        let (seen, handler) = counter();
        let id = router.on_workflow_progress("wf-3", handler);
        let (done, handler) = counter();
        router.subscribe(["workflow.completed"], Default::default(), handler);

        let start = || params(json!({ "workflowId": "wf-3" }));
        runtime.submit("workflow.start", start()).await.unwrap();
        assert!(eventually(|| done.load(Ordering::SeqCst) == 1).await);
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        assert!(router.unsubscribe(id));
        runtime.submit("workflow.start", start()).await.unwrap();
        assert!(eventually(|| done.load(Ordering::SeqCst) == 2).await);
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_injected_notification_is_routed() {
        let runtime = running().await;
        let (seen, handler) = counter();
        runtime.container().router.on_connectivity_change(handler);

        runtime
            .container()
            .transport
            .emit(EventNotification::bare("wifi.disconnected"));
        assert!(eventually(|| seen.load(Ordering::SeqCst) == 1).await);

        runtime.shutdown().await;
    }
}
