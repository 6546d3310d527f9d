//! # Shared Security Helpers
//!
//! Both ends of the link must derive identical signing bytes and agree on
//! what "now" means, so those two concerns live here.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default freshness window for signed requests (5 minutes).
pub const DEFAULT_FRESHNESS_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Default nonce retention (10 minutes, 2x the freshness window).
pub const DEFAULT_NONCE_RETENTION_MS: u64 = 10 * 60 * 1000;

/// Build the bytes a controller signs and a peer verifies.
///
/// Covers exactly `{method, nonce, timestamp}` in that key order, encoded as
/// compact JSON. Params are deliberately excluded.
#[must_use]
pub fn canonical_payload(method: &str, timestamp: u64, nonce: &str) -> Vec<u8> {
    let method = Value::String(method.to_owned());
    let nonce = Value::String(nonce.to_owned());
    format!("{{\"method\":{method},\"nonce\":{nonce},\"timestamp\":{timestamp}}}").into_bytes()
}

/// Current Unix time in milliseconds.
///
/// Returns 0 if the system clock is before the epoch.
#[must_use]
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Time source for consistent timestamp handling.
///
/// Abstracted so freshness, expiry and retention can be tested with a
/// deterministic clock.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// Manually driven clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(initial_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(initial_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_payload_is_deterministic() {
        let a = canonical_payload("file.list", 1_700_000_000_000, "abc");
        let b = canonical_payload("file.list", 1_700_000_000_000, "abc");
        assert_eq!(a, b);
        assert_eq!(
            String::from_utf8(a).unwrap(),
            r#"{"method":"file.list","nonce":"abc","timestamp":1700000000000}"#
        );
    }

    #[test]
    fn test_canonical_payload_binds_method() {
        assert_ne!(
            canonical_payload("file.list", 1, "n"),
            canonical_payload("file.delete", 1, "n")
        );
    }

    #[test]
    fn test_canonical_payload_escapes_strings() {
        let bytes = canonical_payload("a\"b", 1, "n\\");
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["method"], "a\"b");
        assert_eq!(parsed["nonce"], "n\\");
    }

    #[test]
    fn test_system_time_source() {
        // After Jan 1, 2020 in ms
        assert!(SystemTimeSource.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1000);
        assert_eq!(clock.now_ms(), 1000);

        clock.advance(500);
        assert_eq!(clock.now_ms(), 1500);

        clock.set(3000);
        assert_eq!(clock.now_ms(), 3000);
    }
}
