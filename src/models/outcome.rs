//! Classified outcome of a page visit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::Snapshot;

/// Which selector failed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Content,
    Screenshot,
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorKind::Content => f.write_str("content"),
            SelectorKind::Screenshot => f.write_str("screenshot"),
        }
    }
}

/// Result of one visit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        content: String,
        screenshot: Snapshot,
    },
    SoftNotFound,
    ServerError {
        status: u16,
        full_page_screenshot: Option<Snapshot>,
    },
    Blocked {
        full_page_screenshot: Snapshot,
    },
    SelectorFailure {
        kind: SelectorKind,
        full_page_screenshot: Snapshot,
    },
}

impl Outcome {
    /// Failure category, `None` for success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::SoftNotFound => Some(FailureKind::PermanentMissing),
            Outcome::ServerError { .. } | Outcome::Blocked { .. } => {
                Some(FailureKind::TransientBlock)
            }
            Outcome::SelectorFailure { .. } => Some(FailureKind::SelectorMismatch),
        }
    }

    /// Full-page fallback captured alongside a failure.
    pub fn fallback_screenshot(&self) -> Option<&Snapshot> {
        match self {
            Outcome::Blocked {
                full_page_screenshot,
            }
            | Outcome::SelectorFailure {
                full_page_screenshot,
                ..
            } => Some(full_page_screenshot),
            Outcome::ServerError {
                full_page_screenshot,
                ..
            } => full_page_screenshot.as_ref(),
            Outcome::Success { .. } | Outcome::SoftNotFound => None,
        }
    }

    /// Short human-readable description for logs and failure records.
    pub fn describe(&self) -> String {
        match self {
            Outcome::Success { .. } => "success".to_string(),
            Outcome::SoftNotFound => "page returned 404".to_string(),
            Outcome::ServerError { status, .. } => format!("server responded with status {status}"),
            Outcome::Blocked { .. } => "page appears to be blocked (captcha)".to_string(),
            Outcome::SelectorFailure { kind, .. } => {
                format!("{kind} selector did not match any element")
            }
        }
    }
}

/// Failure taxonomy surfaced in records and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Server error or detected block; retryable
    TransientBlock,
    /// HTTP 404; never retried
    PermanentMissing,
    /// Content or screenshot selector did not match
    SelectorMismatch,
    /// Not even a fallback screenshot could be taken
    CaptureFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::TransientBlock => "transient block",
            FailureKind::PermanentMissing => "permanent missing",
            FailureKind::SelectorMismatch => "selector mismatch",
            FailureKind::CaptureFailure => "capture failure",
        };
        f.write_str(name)
    }
}
