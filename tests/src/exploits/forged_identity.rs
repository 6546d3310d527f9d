//! # Forged Identities and Privilege Escalation

#[cfg(test)]
mod tests {
    use crate::fixtures::{unauthorized, PeerFixture, CONTROLLER, OPERATOR};
    use pc_01_auth_gate::{AuthGateApi, PermissionLevel, ReasonCode, RequestSigner};
    use pc_02_command_queue::TransportError;
    use shared_types::SignedRequest;

    fn last_reason(f: &PeerFixture) -> ReasonCode {
        f.gate.audit_log().last().unwrap().reason
    }

    fn with_signature(request: &SignedRequest, signature: Vec<u8>) -> SignedRequest {
        SignedRequest::new(
            request.identity(),
            request.method(),
            request.params().clone(),
            signature,
            request.timestamp(),
            request.nonce(),
        )
    }

    #[tokio::test]
    async fn test_attacker_key_claiming_controller_identity() {
        let f = PeerFixture::new();
        let impostor = RequestSigner::generate(CONTROLLER);
        let envelope = f.sign(&impostor, "system.ping", "n-1");

        assert_eq!(f.deliver("system.ping", &envelope).await, Err(unauthorized()));
        assert_eq!(last_reason(&f), ReasonCode::InvalidSignature);
    }

    #[tokio::test]
    async fn test_unknown_identity_rejected() {
        let f = PeerFixture::new();
        let stranger = RequestSigner::generate("did:key:mallory");
        let envelope = f.sign(&stranger, "system.ping", "n-1");

        assert_eq!(f.deliver("system.ping", &envelope).await, Err(unauthorized()));
        assert_eq!(last_reason(&f), ReasonCode::InvalidSignature);
        assert_eq!(f.gate.audit_log().for_identity("did:key:mallory").len(), 1);
    }

    #[tokio::test]
    async fn test_tampered_signatures_rejected() {
        let f = PeerFixture::new();

        let genuine = f.sign(&f.controller, "system.ping", "flip");
        let mut flipped = genuine.signature().to_vec();
        flipped[0] ^= 0x01;
        assert!(f.deliver("system.ping", &with_signature(&genuine, flipped)).await.is_err());
        assert_eq!(last_reason(&f), ReasonCode::InvalidSignature);

        let genuine = f.sign(&f.controller, "system.ping", "short");
        let truncated = genuine.signature()[..10].to_vec();
        assert!(f.deliver("system.ping", &with_signature(&genuine, truncated)).await.is_err());
        assert_eq!(last_reason(&f), ReasonCode::InvalidSignature);

        let genuine = f.sign(&f.controller, "system.ping", "empty");
        assert!(f.deliver("system.ping", &with_signature(&genuine, Vec::new())).await.is_err());
        assert_eq!(last_reason(&f), ReasonCode::ValidationError);

        assert_eq!(f.peer.executed(), 0);
    }

    #[tokio::test]
    async fn test_valid_signature_without_privilege() {
        let f = PeerFixture::new();
        let envelope = f.sign(&f.operator, "disk.format", "n-1");

        assert_eq!(f.deliver("disk.format", &envelope).await, Err(unauthorized()));
        assert_eq!(last_reason(&f), ReasonCode::InsufficientPermission);

        // Granting Admin lets the request through the gate; the peer then
        // refuses the method itself
        f.permissions.grant(OPERATOR, PermissionLevel::Admin);
        let envelope = f.sign(&f.operator, "disk.format", "n-2");
        assert_eq!(
            f.deliver("disk.format", &envelope).await,
            Err(TransportError::Rejected("unknown method: disk.format".into()))
        );
        assert_eq!(last_reason(&f), ReasonCode::Granted);
    }

    #[tokio::test]
    async fn test_removed_key_stops_working() {
        let f = PeerFixture::new();
        assert!(f.deliver("system.ping", &f.sign(&f.operator, "system.ping", "n-1")).await.is_ok());

        f.keys.remove(OPERATOR);
        assert_eq!(
            f.deliver("system.ping", &f.sign(&f.operator, "system.ping", "n-2")).await,
            Err(unauthorized())
        );
        assert_eq!(last_reason(&f), ReasonCode::InvalidSignature);
    }
}
