//! Block/captcha detection over page markup.

use regex::{Regex, RegexBuilder};

use crate::error::{AppError, Result};

/// Decides whether a rendered page is a block or challenge page.
pub trait BlockDetector: Send + Sync {
    fn is_blocked(&self, html: &str) -> Result<bool>;
}

/// Detector matching case-insensitive regex markers against page HTML.
pub struct MarkerBlockDetector {
    markers: Vec<Regex>,
}

impl MarkerBlockDetector {
    /// Compile `markers`. Fails on the first invalid pattern.
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Result<Self> {
        let markers = markers
            .iter()
            .map(|m| {
                RegexBuilder::new(m.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| AppError::config(format!("Invalid block marker '{}': {e}", m.as_ref())))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { markers })
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl BlockDetector for MarkerBlockDetector {
    fn is_blocked(&self, html: &str) -> Result<bool> {
        Ok(self.markers.iter().any(|m| m.is_match(html)))
    }
}
