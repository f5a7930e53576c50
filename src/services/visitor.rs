// src/services/visitor.rs

//! Page visiting.
//!
//! [`HttpVisitor`] is the browser-less visitor: it fetches the page once,
//! uses outer HTML as the element "screenshot" and the whole document as
//! the full-page fallback.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::{CrawlerConfig, Snapshot, UrlTask, VisitResult, parse_selector};
use crate::services::BlockDetector;
use crate::utils::http::create_async_client;

/// Performs one visit attempt of a page.
///
/// `Err` means navigation itself failed (connection, timeout) and is treated
/// as transient by the workflow.
#[async_trait]
pub trait PageVisitor: Send + Sync {
    async fn visit(&self, task: &UrlTask) -> Result<VisitResult>;
}

/// Visitor built on `reqwest` and `scraper`.
pub struct HttpVisitor {
    client: Client,
    detector: Arc<dyn BlockDetector>,
}

impl HttpVisitor {
    pub fn new(config: &CrawlerConfig, detector: Arc<dyn BlockDetector>) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            detector,
        })
    }

    fn detect_block(&self, url: &str, html: &str) -> bool {
        match self.detector.is_blocked(html) {
            Ok(blocked) => blocked,
            Err(e) => {
                log::warn!("Block detection failed for {url}: {e}. Assuming not blocked.");
                false
            }
        }
    }
}

#[async_trait]
impl PageVisitor for HttpVisitor {
    async fn visit(&self, task: &UrlTask) -> Result<VisitResult> {
        let content_sel = parse_selector(&task.content_selector)?;
        let shot_sel = parse_selector(task.screenshot_selector())?;

        let response = self.client.get(&task.url).send().await?;
        let http_status = response.status().as_u16();
        let html = response.text().await?;
        log::debug!("Fetched {} ({}, {} bytes)", task.url, http_status, html.len());

        let blocked = self.detect_block(&task.url, &html);
        let (extracted_content, element_screenshot) = extract(&html, &content_sel, &shot_sel);

        Ok(VisitResult {
            http_status,
            blocked,
            extracted_content,
            element_screenshot,
            full_page_screenshot: Some(Snapshot::html(html)),
        })
    }
}

/// Text of the first content match and outer HTML of the first screenshot match.
fn extract(html: &str, content_sel: &Selector, shot_sel: &Selector) -> (Option<String>, Option<Snapshot>) {
    let document = Html::parse_document(html);
    let content = document
        .select(content_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string());
    let element = document
        .select(shot_sel)
        .next()
        .map(|el| Snapshot::html(el.html()));
    (content, element)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div id="offer"><span class="price">  12 EUR </span></div>
    </body></html>"#;

    #[test]
    fn test_extract_content_and_element() {
        let content_sel = parse_selector(".price").unwrap();
        let shot_sel = parse_selector("#offer").unwrap();
        let (content, element) = extract(PAGE, &content_sel, &shot_sel);

        assert_eq!(content.as_deref(), Some("12 EUR"));
        let element = element.unwrap();
        assert_eq!(element.content_type, "text/html");
        assert!(String::from_utf8(element.data).unwrap().starts_with("<div id=\"offer\">"));
    }

    #[test]
    fn test_extract_missing_selector() {
        let content_sel = parse_selector(".missing").unwrap();
        let shot_sel = parse_selector("#offer").unwrap();
        let (content, element) = extract(PAGE, &content_sel, &shot_sel);
        assert!(content.is_none());
        assert!(element.is_some());
    }
}
