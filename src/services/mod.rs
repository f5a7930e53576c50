//! Collaborators of the monitoring workflow.
//!
//! - Page visiting (`PageVisitor`, `HttpVisitor`)
//! - Block detection (`BlockDetector`, `MarkerBlockDetector`)
//! - Mail delivery (`Mailer`, `HttpMailer`, `LogMailer`)
//! - Output records (`RecordSink`, `JsonLinesSink`, `MemorySink`)

mod block;
mod mailer;
mod sink;
mod visitor;

pub use block::{BlockDetector, MarkerBlockDetector};
pub use mailer::{HttpMailer, LogMailer, Mailer, mailer_from_config};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
pub use visitor::{HttpVisitor, PageVisitor};
