//! # Audit Log
//!
//! Append-only record of authorization decisions. Only the gate writes;
//! operators read snapshots or follow the live feed.
//!
//! The in-memory window holds the most recent `capacity` entries. Older
//! entries are dropped whole, never rewritten. Anything that must outlive the
//! window follows `subscribe`.

use crate::domain::entities::AuditLogEntry;
use parking_lot::RwLock;
use std::collections::VecDeque;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 1024;

/// Default number of entries kept in memory.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

pub struct AuditLog {
    entries: RwLock<VecDeque<AuditLogEntry>>,
    capacity: usize,
    feed: broadcast::Sender<AuditLogEntry>,
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Keep at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(FEED_CAPACITY))),
            capacity,
            feed,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn append(&self, entry: AuditLogEntry) {
        // No receivers is not an error
        let _ = self.feed.send(entry.clone());
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Snapshot of the retained window in append order.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// Up to `limit` most recent entries, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AuditLogEntry> {
        self.entries.read().iter().rev().take(limit).cloned().collect()
    }

    /// Every decision made for `identity`, in append order.
    #[must_use]
    pub fn for_identity(&self, identity: &str) -> Vec<AuditLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.identity == identity)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<AuditLogEntry> {
        self.entries.read().back().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Live feed of entries appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditLogEntry> {
        self.feed.subscribe()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}
