//! # Method Substitution
//!
//! The signature covers the method the peer executes, so an envelope signed
//! for a harmless method cannot be pointed at another one.

#[cfg(test)]
mod tests {
    use crate::fixtures::{params, raw_command, unauthorized, PeerFixture};
    use pc_01_auth_gate::{AuthGateApi, ReasonCode};
    use pc_02_command_queue::CommandTransport;
    use serde_json::json;
    use shared_types::{SignedRequest, TimeSource};

    #[tokio::test]
    async fn test_ping_signature_cannot_run_status() {
        let f = PeerFixture::new();
        // The operator may call system.status, so only the signature stops this
        let envelope = f.sign(&f.operator, "system.ping", "n-1");

        assert_eq!(f.deliver("system.status", &envelope).await, Err(unauthorized()));

        let entry = f.gate.audit_log().last().unwrap();
        assert_eq!(entry.reason, ReasonCode::InvalidSignature);
        assert_eq!(entry.method, "system.status");
        assert_eq!(f.peer.executed(), 0);
    }

    #[tokio::test]
    async fn test_failed_substitution_burns_the_nonce() {
        let f = PeerFixture::new();
        let envelope = f.sign(&f.controller, "system.ping", "n-1");

        assert!(f.deliver("disk.format", &envelope).await.is_err());
        assert_eq!(f.deliver("system.ping", &envelope).await, Err(unauthorized()));
        assert_eq!(
            f.gate.audit_log().last().unwrap().reason,
            ReasonCode::ReplayedNonce
        );
    }

    #[tokio::test]
    async fn test_rewriting_the_claimed_method_does_not_help() {
        let f = PeerFixture::new();
        let genuine = f.sign(&f.controller, "system.ping", "n-1");
        let forged = SignedRequest::new(
            genuine.identity(),
            "system.status",
            genuine.params().clone(),
            genuine.signature().to_vec(),
            genuine.timestamp(),
            genuine.nonce(),
        );

        assert_eq!(f.deliver("system.status", &forged).await, Err(unauthorized()));
        assert_eq!(
            f.gate.audit_log().last().unwrap().reason,
            ReasonCode::InvalidSignature
        );
    }

    #[tokio::test]
    async fn test_params_travel_outside_the_signature() {
        let f = PeerFixture::new();
        let envelope = f.controller.sign_at(
            "system.echo",
            params(json!({ "value": 1 })),
            f.clock.now_ms(),
            "n-1",
        );

        let mut command = raw_command("system.echo", &envelope);
        command.params = params(json!({ "value": 2 }));

        let reply = f.link.send(&command).await.unwrap();
        assert_eq!(reply, json!({ "value": 2 }));
    }
}
