//! # Nonce Ledger
//!
//! Tracks consumed `(identity, nonce)` pairs until they expire.
//!
//! ## Security Design
//!
//! - A key is held for `retention_ms` after first use, which must be at least
//!   the freshness window so a fresh timestamp can never outlive its nonce
//! - Check-then-insert happens under a single lock, so two concurrent
//!   verifications of the same request cannot both succeed
//! - Memory is bounded by a periodic sweep plus lazy eviction once the ledger
//!   reaches `max_entries`

use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default ceiling before lazy eviction kicks in.
pub const DEFAULT_MAX_LEDGER_ENTRIES: usize = 100_000;

/// Time-bounded record of consumed nonces.
pub struct NonceLedger {
    /// Map of `identity:nonce` -> expiry instant (epoch ms).
    entries: Mutex<HashMap<String, u64>>,

    /// How long a consumed key stays rejected.
    retention_ms: u64,

    /// Size at which expired keys are evicted on insert.
    max_entries: usize,
}

impl NonceLedger {
    /// Create a ledger.
    #[must_use]
    pub fn new(retention_ms: u64, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retention_ms,
            max_entries: max_entries.max(1),
        }
    }

    /// Consume `key` if it is not currently held.
    ///
    /// Returns `true` when the key was fresh and is now recorded with expiry
    /// `now_ms + retention_ms`; `false` when an unexpired entry already
    /// exists (replay). An expired entry is treated as absent and replaced.
    pub fn check_and_insert(&self, key: &str, now_ms: u64) -> bool {
        let mut entries = self.entries.lock();

        if let Some(&expiry) = entries.get(key) {
            if expiry > now_ms {
                return false;
            }
        }

        if entries.len() >= self.max_entries {
            let before = entries.len();
            entries.retain(|_, &mut expiry| expiry > now_ms);
            let evicted = before - entries.len();
            if entries.len() >= self.max_entries {
                warn!(
                    size = entries.len(),
                    max = self.max_entries,
                    "Nonce ledger at capacity with no expired entries"
                );
            } else {
                debug!(evicted, "Lazily evicted expired nonces");
            }
        }

        entries.insert(key.to_owned(), now_ms.saturating_add(self.retention_ms));
        true
    }

    /// Returns true when `key` is held and unexpired at `now_ms`.
    #[must_use]
    pub fn contains(&self, key: &str, now_ms: u64) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|&expiry| expiry > now_ms)
    }

    /// Remove every entry expired at `now_ms`. Returns how many were removed.
    pub fn sweep(&self, now_ms: u64) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, &mut expiry| expiry > now_ms);
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn retention_ms(&self) -> u64 {
        self.retention_ms
    }
}

impl Default for NonceLedger {
    fn default() -> Self {
        Self::new(
            shared_types::DEFAULT_NONCE_RETENTION_MS,
            DEFAULT_MAX_LEDGER_ENTRIES,
        )
    }
}
