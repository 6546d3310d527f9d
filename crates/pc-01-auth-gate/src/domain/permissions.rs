//! # Permission Table
//!
//! Maps method namespaces to a minimum level and identities to a granted
//! level. Lookups use the longest matching namespace, so a rule for
//! `file.delete` overrides a rule for `file`.
//!
//! The table is behind a lock so an operator can reload it while the gate is
//! serving requests.

use crate::domain::entities::PermissionLevel;
use parking_lot::RwLock;
use shared_types::in_namespace;
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Rules {
    method_levels: HashMap<String, PermissionLevel>,
    identity_levels: HashMap<String, PermissionLevel>,
    /// Required level for methods no rule covers.
    default_method_level: PermissionLevel,
    /// Granted level for identities with no explicit grant.
    default_identity_level: PermissionLevel,
}

/// Hot-reloadable permission configuration.
#[derive(Debug)]
pub struct PermissionTable {
    rules: RwLock<Rules>,
}

impl PermissionTable {
    /// Empty table. Unlisted methods require `Admin`; unlisted identities
    /// are `Public`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Rules {
                method_levels: HashMap::new(),
                identity_levels: HashMap::new(),
                default_method_level: PermissionLevel::Admin,
                default_identity_level: PermissionLevel::Public,
            }),
        }
    }

    /// Builder-style method rule.
    #[must_use]
    pub fn with_method_level(self, prefix: impl Into<String>, level: PermissionLevel) -> Self {
        self.set_method_level(prefix, level);
        self
    }

    /// Builder-style identity grant.
    #[must_use]
    pub fn with_identity_level(self, identity: impl Into<String>, level: PermissionLevel) -> Self {
        self.grant(identity, level);
        self
    }

    #[must_use]
    pub fn with_default_method_level(self, level: PermissionLevel) -> Self {
        self.rules.write().default_method_level = level;
        self
    }

    pub fn set_method_level(&self, prefix: impl Into<String>, level: PermissionLevel) {
        self.rules.write().method_levels.insert(prefix.into(), level);
    }

    /// Atomically swap every method rule.
    pub fn replace_method_levels<I, S>(&self, levels: I)
    where
        I: IntoIterator<Item = (S, PermissionLevel)>,
        S: Into<String>,
    {
        let method_levels = levels.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.rules.write().method_levels = method_levels;
    }

    pub fn grant(&self, identity: impl Into<String>, level: PermissionLevel) {
        self.rules.write().identity_levels.insert(identity.into(), level);
    }

    /// Drop an explicit grant. The identity falls back to the default level.
    pub fn revoke(&self, identity: &str) -> Option<PermissionLevel> {
        self.rules.write().identity_levels.remove(identity)
    }

    /// Minimum level for `method` by longest namespace match.
    #[must_use]
    pub fn required_level(&self, method: &str) -> PermissionLevel {
        let rules = self.rules.read();
        rules
            .method_levels
            .iter()
            .filter(|(prefix, _)| in_namespace(method, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(rules.default_method_level, |(_, level)| *level)
    }

    /// Level granted to `identity`.
    #[must_use]
    pub fn granted_level(&self, identity: &str) -> PermissionLevel {
        let rules = self.rules.read();
        rules
            .identity_levels
            .get(identity)
            .copied()
            .unwrap_or(rules.default_identity_level)
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::new()
    }
}
