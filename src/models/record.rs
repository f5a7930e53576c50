//! Structured output record, one per page per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::FailureKind;

/// Final state of a page check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordStatus {
    FirstRun,
    Unchanged,
    Changed,
    Failed,
}

/// Why a page check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: String,
}

/// Output record pushed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub url: String,
    pub status: RecordStatus,
    pub is_first_run: bool,
    pub previous_data: Option<String>,
    pub content: Option<String>,
    pub previous_screenshot_url: Option<String>,
    pub current_screenshot_url: Option<String>,
    pub attempts: u32,
    #[serde(default)]
    pub notified: bool,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureInfo>,
    pub checked_at: DateTime<Utc>,
}

impl OutputRecord {
    /// Record for a page that did not produce usable content.
    pub fn failed(
        url: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            url: url.into(),
            status: RecordStatus::Failed,
            is_first_run: false,
            previous_data: None,
            content: None,
            previous_screenshot_url: None,
            current_screenshot_url: None,
            attempts,
            notified: false,
            truncated: false,
            failure: Some(FailureInfo {
                kind,
                message: message.into(),
            }),
            checked_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == RecordStatus::Failed
    }
}
