//! # Replay Attacks
//!
//! An attacker who captured a granted envelope off the link tries to get the
//! peer to run it again.

#[cfg(test)]
mod tests {
    use crate::fixtures::{unauthorized, PeerFixture, CONTROLLER};
    use control_runtime::adapters::{LoopbackTransport, PeerEndpoint};
    use pc_01_auth_gate::{AuthGateApi, ReasonCode};
    use pc_02_command_queue::CommandTransport;
    use shared_types::{TimeSource, DEFAULT_FRESHNESS_WINDOW_MS, DEFAULT_NONCE_RETENTION_MS};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    fn last_reason(f: &PeerFixture) -> ReasonCode {
        f.gate.audit_log().last().unwrap().reason
    }

    #[tokio::test]
    async fn test_captured_envelope_replay_refused() {
        let f = PeerFixture::new();
        let envelope = f.sign(&f.controller, "system.ping", "n-1");

        assert!(f.deliver("system.ping", &envelope).await.is_ok());
        assert_eq!(f.deliver("system.ping", &envelope).await, Err(unauthorized()));

        assert_eq!(last_reason(&f), ReasonCode::ReplayedNonce);
        assert_eq!(f.peer.executed(), 1);
    }

    #[tokio::test]
    async fn test_replay_after_retention_is_stale() {
        let f = PeerFixture::new();
        let envelope = f.sign(&f.controller, "system.ping", "n-1");
        assert!(f.deliver("system.ping", &envelope).await.is_ok());

        // Ledger entry gone, but so is freshness
        f.clock.advance(DEFAULT_NONCE_RETENTION_MS + 1);
        assert_eq!(f.gate.sweep_nonces(), 1);

        assert_eq!(f.deliver("system.ping", &envelope).await, Err(unauthorized()));
        assert_eq!(last_reason(&f), ReasonCode::ExpiredTimestamp);
    }

    #[tokio::test]
    async fn test_replay_over_a_second_link_refused() {
        let f = PeerFixture::new();
        let envelope = f.sign(&f.controller, "system.ping", "n-1");
        assert!(f.deliver("system.ping", &envelope).await.is_ok());

        let endpoint: Arc<dyn PeerEndpoint> = f.peer.clone();
        let (events, _) = broadcast::channel(4);
        let second = LoopbackTransport::new(endpoint, events);
        second.connect();

        let replay = crate::fixtures::raw_command("system.ping", &envelope);
        assert_eq!(second.send(&replay).await, Err(unauthorized()));
        assert_eq!(last_reason(&f), ReasonCode::ReplayedNonce);
    }

    #[tokio::test]
    async fn test_same_nonce_is_independent_per_identity() {
        let f = PeerFixture::new();
        let a = f.sign(&f.controller, "system.ping", "shared");
        let b = f.sign(&f.operator, "system.ping", "shared");

        assert!(f.deliver("system.ping", &a).await.is_ok());
        assert!(f.deliver("system.ping", &b).await.is_ok());
        assert_eq!(f.peer.executed(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replay_burst_grants_once() {
        let f = Arc::new(PeerFixture::new());
        let envelope = f.sign(&f.controller, "system.ping", "burst");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let f = Arc::clone(&f);
            let envelope = envelope.clone();
            handles.push(tokio::spawn(async move {
                f.deliver("system.ping", &envelope).await.is_ok()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
        assert_eq!(f.peer.executed(), 1);

        let replays = f
            .gate
            .audit_log()
            .for_identity(CONTROLLER)
            .iter()
            .filter(|e| e.reason == ReasonCode::ReplayedNonce)
            .count();
        assert_eq!(replays, 15);
    }

    #[tokio::test]
    async fn test_rejected_future_envelope_keeps_its_nonce() {
        let f = PeerFixture::new();
        let issued_at = f.clock.now_ms() + DEFAULT_FRESHNESS_WINDOW_MS + 1;
        let envelope = f.controller.sign_at("system.ping", Default::default(), issued_at, "early");

        assert_eq!(f.deliver("system.ping", &envelope).await, Err(unauthorized()));
        assert_eq!(last_reason(&f), ReasonCode::ExpiredTimestamp);
        assert!(!f.gate.ledger().contains(&envelope.nonce_key(), f.clock.now_ms()));

        // Once the clock catches up the envelope is simply fresh
        f.clock.advance(2);
        assert!(f.deliver("system.ping", &envelope).await.is_ok());
    }
}
