//! # Control Configuration
//!
//! Unified configuration for every component and runtime parameter.
//!
//! ## Load Order
//!
//! 1. Defaults
//! 2. JSON file named by `PC_CONFIG` (optional, every section may be omitted)
//! 3. Environment overrides
//! 4. `validate()`
//!
//! | Variable | Field |
//! |----------|-------|
//! | `PC_FRESHNESS_WINDOW_MS` | `security.freshness_window_ms` |
//! | `PC_NONCE_RETENTION_MS` | `security.nonce_retention_ms` |
//! | `PC_MAX_RETRIES` | `queue.max_retries` |
//! | `PC_SEND_TIMEOUT_MS` | `queue.send_timeout_ms` |
//! | `PC_DATA_DIR` | `storage.data_dir` |

use pc_01_auth_gate::{AuthGateConfig, PermissionLevel, DEFAULT_AUDIT_CAPACITY, DEFAULT_MAX_LEDGER_ENTRIES};
use pc_02_command_queue::QueueConfig;
use pc_03_event_router::{find_preset, DEFAULT_STREAM_CAPACITY};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use shared_types::{DEFAULT_FRESHNESS_WINDOW_MS, DEFAULT_NONCE_RETENTION_MS};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the JSON config file.
pub const CONFIG_PATH_VAR: &str = "PC_CONFIG";

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub security: SecurityConfig,
    pub queue: QueueSection,
    pub storage: StorageConfig,
    pub router: RouterConfig,
    pub permissions: PermissionsConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Nonce retention ({retention_ms}ms) must cover the freshness window ({window_ms}ms)")]
    RetentionTooShort { retention_ms: u64, window_ms: u64 },

    #[error("Trusted key for {identity} must be 32 bytes, got {length}")]
    InvalidTrustedKey { identity: String, length: usize },

    #[error("Unknown event preset {name:?}")]
    UnknownPreset { name: String },
}

/// Auth gate and controller identity settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub freshness_window_ms: u64,
    /// Must be at least `freshness_window_ms`, otherwise a nonce could be
    /// forgotten while its request is still fresh.
    pub nonce_retention_ms: u64,
    pub max_ledger_entries: usize,
    /// Decisions kept in the in-memory audit log.
    pub audit_capacity: usize,
    /// How often expired nonces are swept.
    pub sweep_interval_ms: u64,
    /// How long resolved public keys are cached.
    pub resolver_cache_ttl_ms: u64,
    /// Identity the local controller signs as.
    pub controller_identity: String,
    /// Level granted to the local controller identity.
    pub controller_level: PermissionLevel,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            nonce_retention_ms: DEFAULT_NONCE_RETENTION_MS,
            max_ledger_entries: DEFAULT_MAX_LEDGER_ENTRIES,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            sweep_interval_ms: 60_000,
            resolver_cache_ttl_ms: 5 * 60 * 1000,
            controller_identity: "did:local:controller".to_string(),
            controller_level: PermissionLevel::Admin,
        }
    }
}

impl SecurityConfig {
    pub fn auth_gate_config(&self) -> AuthGateConfig {
        AuthGateConfig {
            freshness_window_ms: self.freshness_window_ms,
            nonce_retention_ms: self.nonce_retention_ms,
            max_ledger_entries: self.max_ledger_entries,
            audit_capacity: self.audit_capacity,
        }
    }
}

/// Queue retry policy plus runtime housekeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    #[serde(flatten)]
    pub policy: QueueConfig,
    /// How often queue depth is sampled into metrics.
    pub stats_interval_ms: u64,
    /// Rows older than this are removed at startup.
    pub max_age_ms: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            policy: QueueConfig::default(),
            stats_interval_ms: 15_000,
            max_age_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    /// Requires the `rocksdb` feature.
    Rocksdb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    /// Directory holding the command queue database.
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join("command-queue")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Buffer of each category broadcast stream.
    pub stream_capacity: usize,
    /// Buffer of the transport's notification channel.
    pub event_buffer: usize,
    /// Extra preset streams to log, by preset name.
    pub log_presets: Vec<PresetSubscription>,
}

/// A named preset with an optional scope value (e.g. a workflow id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetSubscription {
    pub preset: String,
    #[serde(default)]
    pub scope: Option<serde_json::Value>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            event_buffer: 1024,
            log_presets: Vec::new(),
        }
    }
}

/// Permission table seed and trusted identities.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Level required by methods no prefix matches.
    pub default_method_level: PermissionLevel,
    /// Method prefix to required level.
    pub methods: BTreeMap<String, PermissionLevel>,
    /// Identity to granted level.
    pub identities: BTreeMap<String, PermissionLevel>,
    /// Identity to base64 Ed25519 public key.
    #[serde_as(as = "BTreeMap<_, Base64>")]
    pub trusted_keys: BTreeMap<String, Vec<u8>>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        let methods = [
            ("system.ping", PermissionLevel::Public),
            ("system", PermissionLevel::User),
            ("workflow", PermissionLevel::User),
        ]
        .into_iter()
        .map(|(prefix, level)| (prefix.to_string(), level))
        .collect();

        Self {
            default_method_level: PermissionLevel::Admin,
            methods,
            identities: BTreeMap::new(),
            trusted_keys: BTreeMap::new(),
        }
    }
}

impl ControlConfig {
    /// Load from `PC_CONFIG` (if set) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `PC_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "PC_FRESHNESS_WINDOW_MS")? {
            self.security.freshness_window_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "PC_NONCE_RETENTION_MS")? {
            self.security.nonce_retention_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "PC_MAX_RETRIES")? {
            self.queue.policy.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "PC_SEND_TIMEOUT_MS")? {
            self.queue.policy.send_timeout_ms = v;
        }
        if let Some(dir) = lookup("PC_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Reject settings that would disable a safety bound or panic a timer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let security = &self.security;
        let queue = &self.queue;

        non_zero(security.freshness_window_ms, "security.freshness_window_ms")?;
        non_zero(security.nonce_retention_ms, "security.nonce_retention_ms")?;
        non_zero(security.sweep_interval_ms, "security.sweep_interval_ms")?;
        non_zero(security.max_ledger_entries as u64, "security.max_ledger_entries")?;
        non_zero(security.audit_capacity as u64, "security.audit_capacity")?;
        non_zero(queue.policy.send_timeout_ms, "queue.send_timeout_ms")?;
        non_zero(queue.policy.drain_interval_ms, "queue.drain_interval_ms")?;
        non_zero(queue.stats_interval_ms, "queue.stats_interval_ms")?;
        non_zero(self.router.stream_capacity as u64, "router.stream_capacity")?;
        non_zero(self.router.event_buffer as u64, "router.event_buffer")?;

        if security.nonce_retention_ms < security.freshness_window_ms {
            return Err(ConfigError::RetentionTooShort {
                retention_ms: security.nonce_retention_ms,
                window_ms: security.freshness_window_ms,
            });
        }

        for (identity, key) in &self.permissions.trusted_keys {
            if key.len() != 32 {
                return Err(ConfigError::InvalidTrustedKey {
                    identity: identity.clone(),
                    length: key.len(),
                });
            }
        }

        if let Some(unknown) = self
            .router
            .log_presets
            .iter()
            .find(|subscription| find_preset(&subscription.preset).is_none())
        {
            return Err(ConfigError::UnknownPreset {
                name: unknown.preset.clone(),
            });
        }

        Ok(())
    }
}

fn non_zero(value: u64, field: &'static str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}
