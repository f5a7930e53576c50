// src/models/mod.rs

//! Domain models for the page monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod input;
mod outcome;
mod record;
mod report;
mod task;
mod visit;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, NotificationConfig, RetryStrategy, StorageConfig, parse_selector,
};
pub use input::MonitorInput;
pub use outcome::{FailureKind, Outcome, SelectorKind};
pub use record::{FailureInfo, OutputRecord, RecordStatus};
pub use report::{Attachment, ChangeReport, MailMessage};
pub use task::{TaskKey, UrlTask};
pub use visit::{Snapshot, VisitResult};
