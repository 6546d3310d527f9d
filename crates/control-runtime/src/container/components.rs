use super::config::{ControlConfig, PermissionsConfig, StorageBackend, StorageConfig};
use crate::adapters::{LoopbackTransport, PeerEndpoint, SigningTransport};
use crate::handlers::PeerCommandHandler;
use crate::wiring::MeteredQueue;
use pc_01_auth_gate::{
    AuthGate, CachingIdentityResolver, CryptoError, PermissionTable, PublicKey, RequestSigner,
    StaticIdentityResolver,
};
use pc_02_command_queue::{CommandQueue, CommandStore, InMemoryCommandStore, PersistenceError};
use pc_03_event_router::EventRouter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::info;

pub type PeerResolver = CachingIdentityResolver<Arc<StaticIdentityResolver>>;
pub type PeerGate = AuthGate<PeerResolver, Arc<PermissionTable>>;
pub type ControllerTransport = SigningTransport<Arc<LoopbackTransport>>;
pub type ControlQueue = MeteredQueue<CommandQueue<Arc<dyn CommandStore>, ControllerTransport>>;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Trusted key for {identity} is invalid: {source}")]
    InvalidTrustedKey {
        identity: String,
        #[source]
        source: CryptoError,
    },

    #[error("Failed to open command store: {0}")]
    Storage(#[from] PersistenceError),

    #[error("Storage backend {0:?} is not compiled in (enable the `rocksdb` feature)")]
    BackendUnavailable(StorageBackend),
}

/// Every component of a running controller and its loopback peer.
pub struct ComponentContainer {
    pub keys: Arc<StaticIdentityResolver>,
    pub permissions: Arc<PermissionTable>,
    pub gate: Arc<PeerGate>,
    pub peer: Arc<PeerCommandHandler<PeerGate>>,
    pub transport: Arc<LoopbackTransport>,
    pub queue: Arc<ControlQueue>,
    pub router: Arc<EventRouter>,
    controller_identity: String,
}

impl ComponentContainer {
    pub fn build(config: &ControlConfig) -> Result<Self, ContainerError> {
        let security = &config.security;
        let signer = RequestSigner::generate(security.controller_identity.clone());

        let keys = Arc::new(trusted_keys(&config.permissions)?);
        keys.register(signer.identity(), signer.public_key());

        let permissions = Arc::new(permission_table(&config.permissions));
        permissions.grant(signer.identity(), security.controller_level);

        let gate = Arc::new(AuthGate::new(
            security.auth_gate_config(),
            CachingIdentityResolver::new(Arc::clone(&keys), security.resolver_cache_ttl_ms),
            Arc::clone(&permissions),
        ));

        let (events, _) = broadcast::channel(config.router.event_buffer);
        let peer = Arc::new(PeerCommandHandler::new(Arc::clone(&gate), events.clone()));
        let endpoint: Arc<dyn PeerEndpoint> = peer.clone();
        let transport = Arc::new(LoopbackTransport::new(endpoint, events));

        let controller_identity = signer.identity().to_string();
        let store = open_store(&config.storage)?;
        let queue = Arc::new(MeteredQueue::new(CommandQueue::new(
            store,
            SigningTransport::new(Arc::clone(&transport), signer),
            config.queue.policy.clone(),
        )));

        let router = Arc::new(EventRouter::with_stream_capacity(config.router.stream_capacity));

        info!(
            controller = %controller_identity,
            trusted = keys.len(),
            backend = ?config.storage.backend,
            "Components initialized"
        );

        Ok(Self {
            keys,
            permissions,
            gate,
            peer,
            transport,
            queue,
            router,
            controller_identity,
        })
    }

    /// Identity the controller signs commands as.
    pub fn controller_identity(&self) -> &str {
        &self.controller_identity
    }
}

fn trusted_keys(config: &PermissionsConfig) -> Result<StaticIdentityResolver, ContainerError> {
    let resolver = StaticIdentityResolver::new();
    for (identity, bytes) in &config.trusted_keys {
        let key = PublicKey::from_slice(bytes).map_err(|source| ContainerError::InvalidTrustedKey {
            identity: identity.clone(),
            source,
        })?;
        resolver.register(identity.clone(), key);
    }
    Ok(resolver)
}

fn permission_table(config: &PermissionsConfig) -> PermissionTable {
    let table = PermissionTable::new().with_default_method_level(config.default_method_level);
    table.replace_method_levels(config.methods.iter().map(|(prefix, level)| (prefix.clone(), *level)));
    for (identity, level) in &config.identities {
        table.grant(identity.clone(), *level);
    }
    table
}

fn open_store(config: &StorageConfig) -> Result<Arc<dyn CommandStore>, ContainerError> {
    match config.backend {
        StorageBackend::Memory => {
            let store: Arc<dyn CommandStore> = Arc::new(InMemoryCommandStore::new());
            Ok(store)
        }
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => {
            let rocks = pc_02_command_queue::RocksDbConfig {
                path: config.queue_path().to_string_lossy().into_owned(),
                ..Default::default()
            };
            let store: Arc<dyn CommandStore> =
                Arc::new(pc_02_command_queue::RocksDbCommandStore::open(rocks)?);
            Ok(store)
        }
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(ContainerError::BackendUnavailable(StorageBackend::Rocksdb)),
    }
}
