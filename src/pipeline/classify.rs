//! Outcome classification of a single page visit.
//!
//! Rules, first match wins:
//!
//! 1. status 404 → `SoftNotFound`
//! 2. status >= 400 → `ServerError`
//! 3. blocked → `Blocked`
//! 4. no content → `SelectorFailure(content)`
//! 5. no element screenshot → `SelectorFailure(screenshot)`
//! 6. otherwise → `Success`
//!
//! Rules 3-5 require the full-page fallback the visitor captured; without
//! it the page is a capture failure.

use crate::error::{AppError, Result};
use crate::models::{Outcome, SelectorKind, UrlTask, VisitResult};

/// Classify a visit. Returns [`AppError::Capture`] when a fallback
/// screenshot is required but missing.
pub fn classify(task: &UrlTask, visit: VisitResult) -> Result<Outcome> {
    let VisitResult {
        http_status,
        blocked,
        extracted_content,
        element_screenshot,
        full_page_screenshot,
    } = visit;

    if http_status == 404 {
        return Ok(Outcome::SoftNotFound);
    }
    if http_status >= 400 {
        return Ok(Outcome::ServerError {
            status: http_status,
            full_page_screenshot,
        });
    }

    let fallback = |reason: &str| {
        full_page_screenshot
            .clone()
            .ok_or_else(|| AppError::capture(&task.url, reason))
    };

    if blocked {
        return Ok(Outcome::Blocked {
            full_page_screenshot: fallback("page blocked and no full-page screenshot")?,
        });
    }

    let Some(content) = extracted_content else {
        return Ok(Outcome::SelectorFailure {
            kind: SelectorKind::Content,
            full_page_screenshot: fallback("content selector missed and no full-page screenshot")?,
        });
    };

    let Some(screenshot) = element_screenshot else {
        return Ok(Outcome::SelectorFailure {
            kind: SelectorKind::Screenshot,
            full_page_screenshot: fallback(
                "screenshot selector missed and no full-page screenshot",
            )?,
        });
    };

    Ok(Outcome::Success {
        content,
        screenshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Snapshot;

    fn task() -> UrlTask {
        UrlTask::new("https://example.com/watch", "#main")
    }

    fn full_page() -> Snapshot {
        Snapshot::png(vec![0xAA; 4])
    }

    fn visit() -> VisitResult {
        VisitResult {
            http_status: 200,
            blocked: false,
            extracted_content: Some("price: 10".into()),
            element_screenshot: Some(Snapshot::png(vec![1, 2])),
            full_page_screenshot: Some(full_page()),
        }
    }

    #[test]
    fn test_not_found_wins_over_everything() {
        let mut v = visit();
        v.http_status = 404;
        v.blocked = true;
        v.full_page_screenshot = None;
        assert_eq!(classify(&task(), v).unwrap(), Outcome::SoftNotFound);
    }

    #[test]
    fn test_server_error() {
        let mut v = visit();
        v.http_status = 503;
        v.blocked = true;
        assert_eq!(
            classify(&task(), v).unwrap(),
            Outcome::ServerError {
                status: 503,
                full_page_screenshot: Some(full_page()),
            }
        );
    }

    #[test]
    fn test_server_error_without_fallback_is_not_a_capture_failure() {
        let mut v = visit();
        v.http_status = 500;
        v.full_page_screenshot = None;
        assert!(matches!(
            classify(&task(), v).unwrap(),
            Outcome::ServerError { status: 500, full_page_screenshot: None }
        ));
    }

    #[test]
    fn test_blocked_before_selectors() {
        let mut v = visit();
        v.blocked = true;
        v.extracted_content = None;
        assert_eq!(
            classify(&task(), v).unwrap(),
            Outcome::Blocked {
                full_page_screenshot: full_page()
            }
        );
    }

    #[test]
    fn test_content_selector_failure() {
        let mut v = visit();
        v.extracted_content = None;
        v.element_screenshot = None;
        assert_eq!(
            classify(&task(), v).unwrap(),
            Outcome::SelectorFailure {
                kind: SelectorKind::Content,
                full_page_screenshot: full_page(),
            }
        );
    }

    #[test]
    fn test_screenshot_selector_failure() {
        let mut v = visit();
        v.element_screenshot = None;
        assert_eq!(
            classify(&task(), v).unwrap(),
            Outcome::SelectorFailure {
                kind: SelectorKind::Screenshot,
                full_page_screenshot: full_page(),
            }
        );
    }

    #[test]
    fn test_success() {
        assert_eq!(
            classify(&task(), visit()).unwrap(),
            Outcome::Success {
                content: "price: 10".into(),
                screenshot: Snapshot::png(vec![1, 2]),
            }
        );
    }

    #[test]
    fn test_success_does_not_need_fallback() {
        let mut v = visit();
        v.full_page_screenshot = None;
        assert!(matches!(
            classify(&task(), v).unwrap(),
            Outcome::Success { .. }
        ));
    }

    #[test]
    fn test_empty_content_is_still_content() {
        let mut v = visit();
        v.extracted_content = Some(String::new());
        assert!(matches!(
            classify(&task(), v).unwrap(),
            Outcome::Success { content, .. } if content.is_empty()
        ));
    }

    #[test]
    fn test_missing_fallback_is_capture_failure() {
        let mut v = visit();
        v.blocked = true;
        v.full_page_screenshot = None;
        let err = classify(&task(), v).unwrap_err();
        assert!(matches!(err, AppError::Capture { ref url, .. } if url == "https://example.com/watch"));
    }
}
