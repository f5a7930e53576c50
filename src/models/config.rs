//! Application configuration structures.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::UrlTask;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Page visiting and retry behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Mail notification settings
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Local storage layout
    #[serde(default)]
    pub storage: StorageConfig,

    /// Pages to watch
    #[serde(default)]
    pub tasks: Vec<UrlTask>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Serialize configuration back to TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.navigation_timeout_ms == 0 {
            return Err(AppError::validation(
                "crawler.navigation_timeout_ms must be > 0",
            ));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if let Some(to) = &self.notification.send_to {
            if !is_plausible_address(to) {
                return Err(AppError::validation(format!(
                    "notification.send_to is not a mail address: {to}"
                )));
            }
        }
        if self.tasks.is_empty() {
            return Err(AppError::validation("No tasks defined"));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            task.validate()?;
            if !seen.insert(task.url.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate task url: {}",
                    task.url
                )));
            }
        }
        Ok(())
    }
}

fn is_plausible_address(value: &str) -> bool {
    value
        .split(',')
        .map(str::trim)
        .all(|addr| matches!(addr.split_once('@'), Some((user, host)) if !user.is_empty() && host.contains('.')))
}

/// Which classified outcomes trigger another visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    /// Retry server errors and detected blocks
    #[default]
    OnBlock,
    /// Retry every failure, selector failures included
    OnAllErrors,
    /// Accept the first attempt
    NeverRetry,
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetryStrategy::OnBlock => "on-block",
            RetryStrategy::OnAllErrors => "on-all-errors",
            RetryStrategy::NeverRetry => "never-retry",
        };
        f.write_str(name)
    }
}

/// Page visiting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for page requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Navigation timeout in milliseconds
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Maximum pages checked at once
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Retry policy applied to each page
    #[serde(default)]
    pub retry_strategy: RetryStrategy,

    /// Retries after the first attempt
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Regex markers that identify captcha/block pages
    #[serde(default = "defaults::block_markers")]
    pub block_markers: Vec<String>,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            navigation_timeout_ms: defaults::navigation_timeout(),
            max_concurrent: defaults::max_concurrent(),
            retry_strategy: RetryStrategy::default(),
            max_retries: defaults::max_retries(),
            block_markers: defaults::block_markers(),
        }
    }
}

/// Mail notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Recipient(s), comma separated. No mail is sent when unset.
    #[serde(default)]
    pub send_to: Option<String>,

    /// Subject of the content-changed mail
    #[serde(default = "defaults::subject")]
    pub subject: String,

    /// Subject of the failure mail
    #[serde(default = "defaults::failure_subject")]
    pub failure_subject: String,

    /// Also mail when a page exhausts its retries
    #[serde(default)]
    pub notify_on_failure: bool,

    /// HTTP endpoint of the mail delivery API
    #[serde(default)]
    pub mail_endpoint: Option<String>,

    /// Environment variable holding the mail API token
    #[serde(default = "defaults::mail_token_env")]
    pub mail_token_env: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            send_to: None,
            subject: defaults::subject(),
            failure_subject: defaults::failure_subject(),
            notify_on_failure: false,
            mail_endpoint: None,
            mail_token_env: defaults::mail_token_env(),
        }
    }
}

/// Storage layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL under which stored blobs are served (file:// when unset)
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Output records file, relative to the storage directory
    #[serde(default = "defaults::records_file")]
    pub records_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_base_url: None,
            records_file: defaults::records_file(),
        }
    }
}

/// Parse a CSS selector, mapping failures to [`AppError::Selector`].
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; pagewatch/0.1)".into()
    }
    pub fn navigation_timeout() -> u64 {
        30_000
    }
    pub fn max_concurrent() -> usize {
        5
    }
    pub fn max_retries() -> u32 {
        5
    }
    pub fn block_markers() -> Vec<String> {
        vec![
            r"g-recaptcha".into(),
            r"h-captcha".into(),
            r"cf-challenge|challenge-platform".into(),
            r"<title>\s*access denied".into(),
            r"are you a robot".into(),
        ]
    }

    // Notification defaults
    pub fn subject() -> String {
        "pagewatch: page content changed".into()
    }
    pub fn failure_subject() -> String {
        "pagewatch: page check failed".into()
    }
    pub fn mail_token_env() -> String {
        "PAGEWATCH_MAIL_TOKEN".into()
    }

    // Storage defaults
    pub fn records_file() -> String {
        "records.jsonl".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(url: &str) -> UrlTask {
        UrlTask::new(url, "#main")
    }

    fn valid_config() -> Config {
        Config {
            tasks: vec![task("https://example.com/a")],
            ..Config::default()
        }
    }

    #[test]
    fn validate_valid_config_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_no_tasks() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = valid_config();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_urls() {
        let mut config = valid_config();
        config.tasks.push(task("https://example.com/a"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_recipient() {
        let mut config = valid_config();
        config.notification.send_to = Some("nobody".to_string());
        assert!(config.validate().is_err());

        config.notification.send_to = Some("ops@example.com, dev@example.org".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.crawler.retry_strategy, RetryStrategy::OnBlock);
        assert_eq!(config.crawler.max_retries, 5);
        assert_eq!(config.crawler.navigation_timeout_ms, 30_000);
    }

    #[test]
    fn parses_toml_with_tasks() {
        let config = Config::from_toml(
            r##"
            [crawler]
            retry_strategy = "on-all-errors"
            max_retries = 2

            [notification]
            send_to = "ops@example.com"

            [[tasks]]
            url = "https://example.com/pricing"
            contentSelector = "#price"
            screenshotSelector = ".card"
            "##,
        )
        .unwrap();

        assert_eq!(config.crawler.retry_strategy, RetryStrategy::OnAllErrors);
        assert_eq!(config.crawler.max_retries, 2);
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks[0].screenshot_selector(), ".card");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn retry_strategy_display_matches_serde() {
        for strategy in [
            RetryStrategy::OnBlock,
            RetryStrategy::OnAllErrors,
            RetryStrategy::NeverRetry,
        ] {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{strategy}\""));
        }
    }
}
