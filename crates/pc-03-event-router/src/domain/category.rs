//! # Event Categories
//!
//! Fixed buckets for coarse consumers. Each event lands in at most one bucket,
//! chosen by the first matching namespace in `CATEGORY_TABLE`.

use serde::{Deserialize, Serialize};
use shared_types::in_namespace;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    File,
    Ai,
    Media,
    /// `system.*` and `process.*`
    System,
    /// `network.*` and `wifi.*`
    Network,
    /// `browser.*` and `tab.*`
    Browser,
    Workflow,
}

impl EventCategory {
    pub const ALL: [EventCategory; 7] = [
        Self::File,
        Self::Ai,
        Self::Media,
        Self::System,
        Self::Network,
        Self::Browser,
        Self::Workflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Ai => "ai",
            Self::Media => "media",
            Self::System => "system",
            Self::Network => "network",
            Self::Browser => "browser",
            Self::Workflow => "workflow",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered namespace -> category table. First match wins.
pub const CATEGORY_TABLE: &[(&str, EventCategory)] = &[
    ("file", EventCategory::File),
    ("ai", EventCategory::Ai),
    ("media", EventCategory::Media),
    ("system", EventCategory::System),
    ("process", EventCategory::System),
    ("network", EventCategory::Network),
    ("wifi", EventCategory::Network),
    ("browser", EventCategory::Browser),
    ("tab", EventCategory::Browser),
    ("workflow", EventCategory::Workflow),
];

/// Category for `method`, or `None` when no namespace matches.
pub fn classify(method: &str) -> Option<EventCategory> {
    CATEGORY_TABLE
        .iter()
        .find(|(namespace, _)| in_namespace(method, namespace))
        .map(|(_, category)| *category)
}
