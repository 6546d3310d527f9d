//! # Retry Policy
//!
//! Bounds how many times a command is attempted and how long a failed
//! command waits before its next attempt.

use crate::domain::entities::QueuedCommand;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 30_000;

/// Delay between attempts of the same command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Retry on the next drain pass.
    #[default]
    Immediate,
    Fixed { delay_ms: u64 },
    /// `base_ms * 2^(retries - 1)`, capped at `max_ms`.
    Exponential { base_ms: u64, max_ms: u64 },
}

impl BackoffPolicy {
    /// Wait required after `retries` failed attempts.
    pub fn delay_ms(&self, retries: u32) -> u64 {
        if retries == 0 {
            return 0;
        }
        match *self {
            Self::Immediate => 0,
            Self::Fixed { delay_ms } => delay_ms,
            Self::Exponential { base_ms, max_ms } => {
                let shift = (retries - 1).min(63);
                base_ms
                    .checked_mul(1u64 << shift)
                    .unwrap_or(u64::MAX)
                    .min(max_ms)
            }
        }
    }

    /// Returns true when `row` may be attempted at `now_ms`.
    pub fn is_ready(&self, row: &QueuedCommand, now_ms: u64) -> bool {
        row.updated_at.saturating_add(self.delay_ms(row.retries)) <= now_ms
    }
}

/// Queue tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Attempts before a command is parked as failed.
    pub max_retries: u32,
    pub send_timeout_ms: u64,
    /// Period of the auto-drain timer while connected.
    pub drain_interval_ms: u64,
    pub backoff: BackoffPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            backoff: BackoffPolicy::default(),
        }
    }
}
