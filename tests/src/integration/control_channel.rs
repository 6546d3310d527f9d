//! # Control Channel
//!
//! The assembled [`ControlRuntime`]: configuration, queue, loopback peer and
//! metrics working together.

#[cfg(test)]
mod tests {
    use crate::fixtures::eventually;
    use control_runtime::{ControlConfig, ControlRuntime};
    use pc_01_auth_gate::{AuthGateApi, PermissionLevel, ReasonCode};
    use pc_02_command_queue::CommandQueueApi;
    use shared_types::Params;
    use std::sync::Arc;
    use std::time::Duration;

    async fn started(config: ControlConfig) -> ControlRuntime {
        let runtime = ControlRuntime::new(config).unwrap();
        runtime.start().await.unwrap();
        runtime
    }

    async fn wait_for_total(runtime: &ControlRuntime, total: usize) -> bool {
        for _ in 0..400 {
            if runtime.container().queue.stats().await.unwrap().total == total {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_round_trip_is_audited_and_metered() {
        control_telemetry::register_metrics().unwrap();
        let runtime = started(ControlConfig::default()).await;

        runtime.submit("system.ping", Params::new()).await.unwrap();
        runtime.connect();

        let peer = Arc::clone(&runtime.container().peer);
        assert!(eventually(|| peer.executed() == 1).await);
        assert!(wait_for_total(&runtime, 0).await);

        let entry = runtime.container().gate.audit_log().last().unwrap();
        assert!(entry.granted);
        assert_eq!(entry.identity, runtime.container().controller_identity());

        let metrics = control_telemetry::gather_metrics().unwrap();
        assert!(metrics.contains("pc_queue_drained_total"));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_denied_command_fails_then_succeeds_after_grant() {
        let mut config = ControlConfig::default();
        config.queue.policy.max_retries = 1;
        config
            .permissions
            .methods
            .insert("system.status".into(), PermissionLevel::Owner);
        let runtime = started(config).await;
        let c = runtime.container();

        runtime.submit("system.status", Params::new()).await.unwrap();
        runtime.connect();

        let mut failed = 0;
        for _ in 0..400 {
            failed = c.queue.stats().await.unwrap().failed;
            if failed == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(failed, 1);
        assert_eq!(
            c.gate.audit_log().last().unwrap().reason,
            ReasonCode::InsufficientPermission
        );

        c.permissions.grant(c.controller_identity(), PermissionLevel::Owner);
        assert_eq!(c.queue.retry_failed_commands().await.unwrap(), 1);
        assert!(wait_for_total(&runtime, 0).await);
        assert_eq!(c.peer.executed(), 1);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_pauses_delivery() {
        let runtime = started(ControlConfig::default()).await;
        let peer = Arc::clone(&runtime.container().peer);

        runtime.connect();
        runtime.disconnect();
        runtime.submit("system.ping", Params::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(peer.executed(), 0);
        assert_eq!(runtime.container().queue.stats().await.unwrap().pending, 1);

        runtime.connect();
        assert!(eventually(|| peer.executed() == 1).await);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_nothing_drains_after_shutdown() {
        let runtime = started(ControlConfig::default()).await;
        runtime.shutdown().await;

        runtime.submit("system.ping", Params::new()).await.unwrap();
        runtime.connect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(runtime.container().peer.executed(), 0);
        assert_eq!(runtime.container().queue.stats().await.unwrap().pending, 1);
    }
}
