//! Raw result of a single page visit.

use serde::{Deserialize, Serialize};

use crate::utils::digest_hex;

/// Captured visual state of a page or element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl Snapshot {
    pub fn new(data: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    /// PNG image snapshot.
    pub fn png(data: impl Into<Vec<u8>>) -> Self {
        Self::new(data, "image/png")
    }

    /// HTML markup snapshot.
    pub fn html(markup: impl Into<String>) -> Self {
        Self::new(markup.into().into_bytes(), "text/html")
    }

    /// Hex SHA-256 of the snapshot bytes.
    pub fn digest(&self) -> String {
        digest_hex(&self.data)
    }

    /// File extension for the content type.
    pub fn extension(&self) -> &'static str {
        let mime = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        match mime {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "text/html" => "html",
            _ => "bin",
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Everything one visit attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitResult {
    pub http_status: u16,
    pub blocked: bool,
    pub extracted_content: Option<String>,
    pub element_screenshot: Option<Snapshot>,
    pub full_page_screenshot: Option<Snapshot>,
}

impl VisitResult {
    /// A successful visit with both selectors matched.
    pub fn ok(content: impl Into<String>, screenshot: Snapshot) -> Self {
        Self {
            http_status: 200,
            blocked: false,
            extracted_content: Some(content.into()),
            element_screenshot: Some(screenshot),
            full_page_screenshot: None,
        }
    }

    /// A visit that only returned a status code and a full-page fallback.
    pub fn status(http_status: u16, full_page: Option<Snapshot>) -> Self {
        Self {
            http_status,
            blocked: false,
            extracted_content: None,
            element_screenshot: None,
            full_page_screenshot: full_page,
        }
    }
}
