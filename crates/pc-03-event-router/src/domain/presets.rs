//! # Subscription Presets
//!
//! Common subscriptions expressed as data: a set of event types plus the
//! payload key that identifies one stream of interest.

use crate::domain::subscription::SubscriptionSpec;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub event_types: &'static [&'static str],
    /// Param that scopes the subscription to one entity, if any.
    pub filter_key: Option<&'static str>,
}

pub const CONNECTIVITY: Preset = Preset {
    name: "connectivity",
    event_types: &["network", "wifi"],
    filter_key: None,
};

pub const WORKFLOW_PROGRESS: Preset = Preset {
    name: "workflow_progress",
    event_types: &["workflow.progress", "workflow.completed", "workflow.failed"],
    filter_key: Some("workflowId"),
};

pub const FILE_TRANSFER: Preset = Preset {
    name: "file_transfer",
    event_types: &["file.transfer"],
    filter_key: Some("transferId"),
};

pub const AI_STREAM: Preset = Preset {
    name: "ai_stream",
    event_types: &["ai.stream"],
    filter_key: Some("sessionId"),
};

pub const PROCESS_OUTPUT: Preset = Preset {
    name: "process_output",
    event_types: &["process.output", "process.exit"],
    filter_key: Some("pid"),
};

pub const BROWSER_TAB: Preset = Preset {
    name: "browser_tab",
    event_types: &["browser.tab", "tab"],
    filter_key: Some("tabId"),
};

pub const ALL_PRESETS: &[Preset] = &[
    CONNECTIVITY,
    WORKFLOW_PROGRESS,
    FILE_TRANSFER,
    AI_STREAM,
    PROCESS_OUTPUT,
    BROWSER_TAB,
];

impl Preset {
    /// Subscription for this preset. `scope` is ignored for presets without a
    /// filter key; `None` subscribes to every entity.
    pub fn spec(&self, scope: Option<Value>) -> SubscriptionSpec {
        let spec = SubscriptionSpec::new(self.event_types.iter().copied());
        match (self.filter_key, scope) {
            (Some(key), Some(value)) => spec.with_filter(key, value),
            _ => spec,
        }
    }
}

pub fn find(name: &str) -> Option<&'static Preset> {
    ALL_PRESETS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::EventNotification;

    #[test]
    fn test_scoped_preset() {
        let spec = WORKFLOW_PROGRESS.spec(Some(json!("abc")));
        let mut params = shared_types::Params::new();
        params.insert("workflowId".into(), json!("abc"));
        assert!(spec.matches(&EventNotification::new("workflow.progress", params)));
        assert!(!spec.matches(&EventNotification::bare("workflow.progress")));
    }

    #[test]
    fn test_unscoped_preset_ignores_scope() {
        let spec = CONNECTIVITY.spec(Some(json!("ignored")));
        assert!(spec.filters.is_empty());
        assert!(spec.matches(&EventNotification::bare("wifi.disconnected")));
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(find("ai_stream"), Some(&AI_STREAM));
        assert!(find("nope").is_none());
    }
}
