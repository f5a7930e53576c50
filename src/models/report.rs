//! Notification payloads.

use serde::{Deserialize, Serialize};

/// Text-safe encoded file attached to a mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    /// Base64 payload
    pub data: String,
}

/// Report assembled when the watched content changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    pub url: String,
    pub text: String,
    pub previous_content: String,
    pub current_content: String,
    pub previous_screenshot_ref: Option<String>,
    pub current_screenshot_ref: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Attachments were dropped to stay within the byte budget
    pub truncated: bool,
}

impl ChangeReport {
    /// Address the report to `to` under `subject`.
    pub fn into_message(self, to: impl Into<String>, subject: impl Into<String>) -> MailMessage {
        MailMessage {
            to: to.into(),
            subject: subject.into(),
            text: self.text,
            attachments: self.attachments,
        }
    }
}

/// A mail ready for the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}
