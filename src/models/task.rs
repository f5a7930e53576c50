//! Watched page definition and its stable identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::config::parse_selector;
use crate::utils::digest_hex;

/// A page to watch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlTask {
    /// Page URL
    pub url: String,

    /// CSS selector whose text is compared between runs
    pub content_selector: String,

    /// CSS selector of the element snapshot (defaults to `content_selector`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_selector: Option<String>,

    /// Free text appended to notifications for this page
    #[serde(
        default,
        alias = "sendNotificationText",
        skip_serializing_if = "Option::is_none"
    )]
    pub notification_note: Option<String>,
}

impl UrlTask {
    pub fn new(url: impl Into<String>, content_selector: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_selector: content_selector.into(),
            screenshot_selector: None,
            notification_note: None,
        }
    }

    /// Identity key derived from the URL only.
    pub fn key(&self) -> TaskKey {
        TaskKey::for_url(&self.url)
    }

    /// Selector used for the element snapshot.
    pub fn screenshot_selector(&self) -> &str {
        self.screenshot_selector
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.content_selector)
    }

    /// Check URL scheme and selector syntax.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "Unsupported scheme for {}",
                self.url
            )));
        }
        if self.content_selector.trim().is_empty() {
            return Err(AppError::validation(format!(
                "Empty contentSelector for {}",
                self.url
            )));
        }
        parse_selector(&self.content_selector)?;
        parse_selector(self.screenshot_selector())?;
        Ok(())
    }
}

/// Deterministic, URL-safe identity of a [`UrlTask`].
///
/// Full SHA-256 of the URL in lowercase hex: identical URLs share a key,
/// distinct URLs do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn for_url(url: &str) -> Self {
        Self(digest_hex(url.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
