//! Change-detection pipeline.
//!
//! - `classify`: visit result → outcome
//! - `retry`: outcome → retry decision
//! - `diff`: baseline vs current content
//! - `notify`: size-bounded change reports
//! - `workflow`: the per-URL state machine
//! - `monitor`: concurrent run over all tasks

pub mod classify;
pub mod diff;
pub mod monitor;
pub mod notify;
pub mod retry;
pub mod workflow;

pub use classify::classify;
pub use diff::{ContentDiff, calculate_diff};
pub use monitor::{RunSummary, run_monitor};
pub use notify::{ATTACHMENT_BYTE_BUDGET, NotificationAssembler, ReportDraft, failure_text};
pub use retry::{RetryDecision, RetryPolicy, decide, decide_transient, max_request_retries};
pub use workflow::Workflow;
