//! # Offline Delivery
//!
//! Commands queued while the link is down reach the peer, through the auth
//! gate, once it comes back.
//!
//! ```text
//! CommandQueue ──→ SigningTransport ──→ LoopbackTransport ──→ PeerCommandHandler ──→ AuthGate
//!      ▲                                        │
//!      └──────── spawn_auto_drain ←── connection watch
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{eventually, params, PeerFixture, CONTROLLER};
    use control_runtime::adapters::{LoopbackTransport, SigningTransport};
    use futures::StreamExt;
    use pc_01_auth_gate::{AuthGateApi, PermissionLevel, ReasonCode, RequestSigner};
    use pc_02_command_queue::{
        spawn_auto_drain, CommandQueue, CommandQueueApi, CommandStatus, CommandStore,
        InMemoryCommandStore, OutboundCommand, QueueConfig,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    type Queue = CommandQueue<Arc<InMemoryCommandStore>, SigningTransport<Arc<LoopbackTransport>>>;

    fn queue_for(f: &PeerFixture, config: QueueConfig) -> (Arc<Queue>, Arc<InMemoryCommandStore>) {
        let store = Arc::new(InMemoryCommandStore::new());
        let signer = RequestSigner::from_seed(CONTROLLER, [1u8; 32]);
        let queue = Arc::new(CommandQueue::new(
            Arc::clone(&store),
            SigningTransport::new(Arc::clone(&f.link), signer),
            config,
        ));
        (queue, store)
    }

    fn workflow(id: &str) -> OutboundCommand {
        OutboundCommand::new("workflow.start", params(json!({ "workflowId": id })))
    }

    #[tokio::test]
    async fn test_offline_commands_delivered_in_order_on_connect() {
        let f = PeerFixture::live();
        f.link.disconnect();
        let (queue, store) = queue_for(&f, QueueConfig::default());
        let mut events = f.link.events();

        for id in ["wf-1", "wf-2", "wf-3"] {
            queue.enqueue(workflow(id)).await.unwrap();
        }
        let drain = spawn_auto_drain(
            Arc::clone(&queue),
            f.link.connection(),
            Duration::from_secs(3600),
        );
        tokio::task::yield_now().await;
        assert_eq!(f.peer.executed(), 0);

        f.link.connect();
        assert!(eventually(|| f.peer.executed() == 3).await);
        assert!(queue.stats().await.unwrap().total == 0);

        let mut completed = Vec::new();
        while completed.len() < 3 {
            let event = events.next().await.unwrap();
            if event.method == "workflow.completed" {
                completed.push(event.param("workflowId").cloned().unwrap());
            }
        }
        assert_eq!(completed, vec![json!("wf-1"), json!("wf-2"), json!("wf-3")]);

        drain.shutdown().await;
    }

    #[tokio::test]
    async fn test_send_while_disconnected_counts_as_attempt() {
        let f = PeerFixture::live();
        f.link.disconnect();
        let (queue, store) = queue_for(&f, QueueConfig::default());

        let id = queue
            .enqueue(OutboundCommand::new("system.ping", Default::default()))
            .await
            .unwrap();
        assert_eq!(queue.dequeue_and_send().await.unwrap(), 0);

        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.status, CommandStatus::Pending);
        assert_eq!(row.retries, 1);
        assert!(row.error_message.unwrap().contains("not connected"));
        // Never reached the gate
        assert!(f.gate.audit_log().is_empty());

        f.link.connect();
        assert_eq!(queue.dequeue_and_send().await.unwrap(), 1);
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_peer_rejection_exhausts_retries() {
        let f = PeerFixture::live();
        let config = QueueConfig {
            max_retries: 2,
            ..QueueConfig::default()
        };
        let (queue, store) = queue_for(&f, config);

        let id = queue
            .enqueue(OutboundCommand::new("disk.format", Default::default()))
            .await
            .unwrap();
        queue.dequeue_and_send().await.unwrap();
        queue.dequeue_and_send().await.unwrap();

        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.status, CommandStatus::Failed);
        assert_eq!(row.retries, 2);
        assert!(row.error_message.unwrap().contains("unknown method"));

        // Failed rows are not picked up by a normal drain
        assert_eq!(queue.dequeue_and_send().await.unwrap(), 0);
        assert_eq!(f.gate.audit_log().len(), 2);
    }

    #[tokio::test]
    async fn test_retry_is_signed_with_a_fresh_nonce() {
        let f = PeerFixture::live();
        let (queue, store) = queue_for(&f, QueueConfig::default());

        f.permissions.grant(CONTROLLER, PermissionLevel::Public);
        let id = queue
            .enqueue(OutboundCommand::new("system.status", Default::default()))
            .await
            .unwrap();
        assert_eq!(queue.dequeue_and_send().await.unwrap(), 0);
        assert_eq!(
            f.gate.audit_log().last().unwrap().reason,
            ReasonCode::InsufficientPermission
        );

        // Had the first envelope been reused this would be a replay
        f.permissions.grant(CONTROLLER, PermissionLevel::Admin);
        assert_eq!(queue.dequeue_and_send().await.unwrap(), 1);
        assert_eq!(f.gate.audit_log().last().unwrap().reason, ReasonCode::Granted);
        assert!(store.get(id).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_peer_times_out() {
        let f = PeerFixture::live();
        f.link.set_latency(Duration::from_millis(200));
        let config = QueueConfig {
            send_timeout_ms: 50,
            ..QueueConfig::default()
        };
        let (queue, store) = queue_for(&f, config);

        let id = queue
            .enqueue(OutboundCommand::new("system.ping", Default::default()))
            .await
            .unwrap();
        assert_eq!(queue.dequeue_and_send().await.unwrap(), 0);

        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.retries, 1);
        assert!(row.error_message.unwrap().contains("timed out"));
        assert_eq!(f.peer.executed(), 0);
    }
}
