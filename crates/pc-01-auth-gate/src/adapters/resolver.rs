//! # Identity Resolver Adapters
//!
//! - `StaticIdentityResolver`: in-memory registry, for peers with a fixed set
//!   of paired controllers and for tests
//! - `CachingIdentityResolver`: TTL cache in front of a slower resolver

use crate::domain::errors::ResolutionError;
use crate::domain::signature::PublicKey;
use crate::ports::outbound::IdentityResolver;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{SystemTimeSource, TimeSource};
use std::collections::HashMap;
use tracing::debug;

/// In-memory identity -> key registry.
#[derive(Debug, Default)]
pub struct StaticIdentityResolver {
    keys: RwLock<HashMap<String, PublicKey>>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the key for `identity`.
    pub fn register(&self, identity: impl Into<String>, key: PublicKey) {
        self.keys.write().insert(identity.into(), key);
    }

    pub fn remove(&self, identity: &str) -> Option<PublicKey> {
        self.keys.write().remove(identity)
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, identity: &str) -> Result<PublicKey, ResolutionError> {
        self.keys
            .read()
            .get(identity)
            .copied()
            .ok_or_else(|| ResolutionError::UnknownIdentity(identity.to_owned()))
    }
}

/// Caches successful resolutions for `ttl_ms`. Failures are never cached, so
/// a transient outage does not pin a rejection.
pub struct CachingIdentityResolver<R, C = SystemTimeSource> {
    inner: R,
    ttl_ms: u64,
    /// identity -> (key, expires_at)
    cache: Mutex<HashMap<String, (PublicKey, u64)>>,
    clock: C,
}

impl<R: IdentityResolver> CachingIdentityResolver<R, SystemTimeSource> {
    pub fn new(inner: R, ttl_ms: u64) -> Self {
        Self::with_clock(inner, ttl_ms, SystemTimeSource)
    }
}

impl<R: IdentityResolver, C: TimeSource> CachingIdentityResolver<R, C> {
    pub fn with_clock(inner: R, ttl_ms: u64, clock: C) -> Self {
        Self {
            inner,
            ttl_ms,
            cache: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Forget a cached key, e.g. after rotation.
    pub fn invalidate(&self, identity: &str) {
        self.cache.lock().remove(identity);
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }
}

#[async_trait]
impl<R: IdentityResolver, C: TimeSource> IdentityResolver for CachingIdentityResolver<R, C> {
    async fn resolve(&self, identity: &str) -> Result<PublicKey, ResolutionError> {
        let now = self.clock.now_ms();
        let cached = self
            .cache
            .lock()
            .get(identity)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(key, _)| *key);
        if let Some(key) = cached {
            return Ok(key);
        }

        let key = self.inner.resolve(identity).await?;
        debug!(identity, ttl_ms = self.ttl_ms, "Caching resolved identity");
        self.cache
            .lock()
            .insert(identity.to_owned(), (key, now.saturating_add(self.ttl_ms)));
        Ok(key)
    }
}
