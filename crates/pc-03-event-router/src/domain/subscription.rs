//! # Subscriptions

use serde::{Deserialize, Serialize};
use shared_types::{in_namespace, EventNotification, Params};
use std::fmt;

/// Opaque subscription handle, unique per router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a subscription wants to see.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubscriptionSpec {
    /// Method names or namespaces. An event matches if its method equals one
    /// of these or lives under it. Empty matches nothing.
    pub event_types: Vec<String>,
    /// Every key must be present in the event params with an equal value.
    #[serde(default)]
    pub filters: Params,
}

impl SubscriptionSpec {
    pub fn new<I, S>(event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            event_types: event_types.into_iter().map(Into::into).collect(),
            filters: Params::new(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Params) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn matches(&self, event: &EventNotification) -> bool {
        let type_match = self
            .event_types
            .iter()
            .any(|t| in_namespace(&event.method, t));

        type_match
            && self
                .filters
                .iter()
                .all(|(key, expected)| event.params.get(key) == Some(expected))
    }
}
