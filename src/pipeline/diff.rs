//! Diff calculation between the stored baseline and the current content.
//!
//! Comparison is exact: case and whitespace sensitive, no normalization.
//! Any byte difference in the extracted text is a change.

use serde::{Deserialize, Serialize};

use crate::storage::Baseline;

/// Result of comparing current content against a baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentDiff {
    /// No baseline stored yet
    FirstRun,
    Unchanged,
    Changed,
}

impl ContentDiff {
    /// Check if a notification is warranted.
    pub fn has_changes(&self) -> bool {
        matches!(self, ContentDiff::Changed)
    }
}

/// Compare `current` against `baseline`.
///
/// A baseline without stored content has nothing to compare against and is
/// treated like a first run.
pub fn calculate_diff(baseline: Option<&Baseline>, current: &str) -> ContentDiff {
    match baseline.and_then(|b| b.content.as_deref()) {
        None => ContentDiff::FirstRun,
        Some(previous) if previous == current => ContentDiff::Unchanged,
        Some(_) => ContentDiff::Changed,
    }
}
