//! Signs outbound commands at send time so every attempt, including retries,
//! carries a fresh timestamp and nonce.

use async_trait::async_trait;
use pc_01_auth_gate::RequestSigner;
use pc_02_command_queue::{CommandTransport, DispatchedCommand, TransportError};
use serde_json::Value;

pub struct SigningTransport<T> {
    inner: T,
    signer: RequestSigner,
}

impl<T> SigningTransport<T> {
    pub fn new(inner: T, signer: RequestSigner) -> Self {
        Self { inner, signer }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn identity(&self) -> &str {
        self.signer.identity()
    }
}

#[async_trait]
impl<T: CommandTransport> CommandTransport for SigningTransport<T> {
    async fn send(&self, command: &DispatchedCommand) -> Result<Value, TransportError> {
        // Commands enqueued with their own envelope are forwarded untouched
        if command.auth.is_some() {
            return self.inner.send(command).await;
        }

        let request = self.signer.sign(&command.method, command.params.clone());
        let auth = serde_json::to_value(&request).map_err(|e| TransportError::Io(e.to_string()))?;
        let signed = DispatchedCommand {
            auth: Some(auth),
            ..command.clone()
        };
        self.inner.send(&signed).await
    }
}
