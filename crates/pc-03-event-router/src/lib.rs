//! # Event Router Subsystem (PC-03)
//!
//! Turns the peer's untyped notification stream into category streams and
//! filtered, typed subscriptions.
//!
//! ## Category Table
//!
//! | Namespace | Category |
//! |-----------|----------|
//! | `file` | File |
//! | `ai` | Ai |
//! | `media` | Media |
//! | `system`, `process` | System |
//! | `network`, `wifi` | Network |
//! | `browser`, `tab` | Browser |
//! | `workflow` | Workflow |
//!
//! A namespace matches a method equal to it or starting with it followed by
//! a dot. Events outside the table are not streamed but still reach
//! subscriptions.
//!
//! ## Presets
//!
//! | Helper | Event types | Scoped by |
//! |--------|-------------|-----------|
//! | `on_connectivity_change` | `network`, `wifi` | - |
//! | `on_workflow_progress` | `workflow.progress`, `.completed`, `.failed` | `workflowId` |
//! | `on_file_transfer` | `file.transfer` | `transferId` |
//! | `on_ai_stream` | `ai.stream` | `sessionId` |
//! | `on_process_output` | `process.output`, `process.exit` | `pid` |
//! | `on_tab_update` | `browser.tab`, `tab` | `tabId` |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod domain;
pub mod handler;
pub mod router;

pub use domain::category::{classify, EventCategory, CATEGORY_TABLE};
pub use domain::presets::{find as find_preset, Preset};
pub use domain::subscription::{SubscriptionId, SubscriptionSpec};
pub use handler::{async_handler_fn, handler_fn, EventHandler, HandlerError};
pub use router::{DispatchReport, EventRouter, DEFAULT_STREAM_CAPACITY};
