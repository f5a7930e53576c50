//! JSON run input, as accepted by the Lambda handler and `run --input`.

use serde::Deserialize;

use crate::models::{Config, RetryStrategy, UrlTask};

/// Run input overriding parts of the file configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorInput {
    /// Pages to watch; replaces the configured tasks when non-empty
    #[serde(default)]
    pub urls: Vec<UrlTask>,

    #[serde(default)]
    pub send_notification_to: Option<String>,

    #[serde(default)]
    pub retry_strategy: Option<RetryStrategy>,

    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Navigation timeout in milliseconds
    #[serde(default)]
    pub navigation_timeout: Option<u64>,
}

impl MonitorInput {
    /// Apply this input on top of `config`.
    pub fn apply(self, mut config: Config) -> Config {
        if !self.urls.is_empty() {
            config.tasks = self.urls;
        }
        if let Some(to) = self.send_notification_to.filter(|s| !s.trim().is_empty()) {
            config.notification.send_to = Some(to);
        }
        if let Some(strategy) = self.retry_strategy {
            config.crawler.retry_strategy = strategy;
        }
        if let Some(max) = self.max_retries {
            config.crawler.max_retries = max;
        }
        if let Some(ms) = self.navigation_timeout {
            config.crawler.navigation_timeout_ms = ms;
        }
        config
    }
}
