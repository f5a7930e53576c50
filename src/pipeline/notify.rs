//! Notification assembly.
//!
//! Screenshots are attached as a before/after pair or not at all. When the
//! combined encoded size reaches the byte budget both are dropped and the
//! report text says so.

use std::fmt::Write;

use crate::models::{Attachment, ChangeReport, FailureKind, Snapshot, UrlTask};
use crate::utils::encode_base64;

/// Budget for the encoded size of both attachments together.
pub const ATTACHMENT_BYTE_BUDGET: usize = 9 * 1024 * 1024;

/// Inputs for a change report.
#[derive(Debug, Clone)]
pub struct ReportDraft<'a> {
    pub task: &'a UrlTask,
    pub previous_content: &'a str,
    pub current_content: &'a str,
    pub previous_screenshot: Option<&'a Snapshot>,
    pub current_screenshot: &'a Snapshot,
    pub previous_screenshot_ref: Option<String>,
    pub current_screenshot_ref: Option<String>,
}

/// Builds size-bounded change reports.
#[derive(Debug, Clone, Copy)]
pub struct NotificationAssembler {
    budget: usize,
}

impl Default for NotificationAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationAssembler {
    pub fn new() -> Self {
        Self::with_budget(ATTACHMENT_BYTE_BUDGET)
    }

    pub fn with_budget(budget: usize) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Assemble the report for a changed page.
    pub fn assemble(&self, draft: ReportDraft<'_>) -> ChangeReport {
        let mut text = format!(
            "URL: {}\n\nPrevious data: {}\n\nCurrent data: {}\n",
            draft.task.url, draft.previous_content, draft.current_content
        );
        push_screenshot_refs(
            &mut text,
            draft.previous_screenshot_ref.as_deref(),
            draft.current_screenshot_ref.as_deref(),
        );
        if let Some(note) = draft.task.notification_note.as_deref() {
            let _ = write!(text, "\n{note}\n");
        }

        let mut attachments = Vec::new();
        let mut truncated = false;

        match draft.previous_screenshot {
            Some(previous) => {
                let prev = encode_attachment("previous", previous);
                let curr = encode_attachment("current", draft.current_screenshot);
                let total = prev.data.len() + curr.data.len();

                if total < self.budget {
                    attachments.push(prev);
                    attachments.push(curr);
                } else {
                    log::warn!(
                        "Screenshots for {} total {} encoded bytes, over the {} byte budget; not attaching",
                        draft.task.url,
                        total,
                        self.budget
                    );
                    let _ = write!(
                        text,
                        "\nScreenshots not attached: their encoded size ({total} bytes) exceeds the {} byte attachment limit.\n",
                        self.budget
                    );
                    truncated = true;
                }
            }
            None => {
                text.push_str("\nNo previous screenshot is stored, so none are attached.\n");
            }
        }

        ChangeReport {
            url: draft.task.url.clone(),
            text,
            previous_content: draft.previous_content.to_string(),
            current_content: draft.current_content.to_string(),
            previous_screenshot_ref: draft.previous_screenshot_ref,
            current_screenshot_ref: draft.current_screenshot_ref,
            attachments,
            truncated,
        }
    }
}

/// Text of the informational mail sent when a page check fails.
pub fn failure_text(
    task: &UrlTask,
    kind: FailureKind,
    message: &str,
    attempts: u32,
    screenshot_ref: Option<&str>,
) -> String {
    let mut text = format!(
        "URL: {}\n\nThe page could not be checked ({kind}) after {attempts} attempt(s).\nReason: {message}\n",
        task.url
    );
    if let Some(url) = screenshot_ref {
        let _ = write!(text, "\nLast page screenshot: {url}\n");
    }
    if let Some(note) = task.notification_note.as_deref() {
        let _ = write!(text, "\n{note}\n");
    }
    text
}

fn push_screenshot_refs(text: &mut String, previous: Option<&str>, current: Option<&str>) {
    if previous.is_none() && current.is_none() {
        return;
    }
    text.push('\n');
    if let Some(url) = previous {
        let _ = writeln!(text, "Previous screenshot: {url}");
    }
    if let Some(url) = current {
        let _ = writeln!(text, "Current screenshot: {url}");
    }
}

fn encode_attachment(stem: &str, snapshot: &Snapshot) -> Attachment {
    Attachment {
        filename: format!("{stem}.{}", snapshot.extension()),
        content_type: snapshot.content_type.clone(),
        data: encode_base64(&snapshot.data),
    }
}
