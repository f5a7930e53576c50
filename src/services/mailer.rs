//! Mail delivery.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{MailMessage, NotificationConfig};
use crate::utils::http::create_api_client;

const MAIL_TIMEOUT_SECS: u64 = 60;

/// Delivers assembled mails.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Posts mails as JSON to an HTTP mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: create_api_client(MAIL_TIMEOUT_SECS)?,
            endpoint: endpoint.into(),
            token,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::mail(status.as_u16(), body.trim()));
        }

        log::info!(
            "Mail '{}' sent to {} ({} attachment(s))",
            message.subject,
            message.to,
            message.attachments.len()
        );
        Ok(())
    }
}

/// Logs mails instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        log::info!(
            "No mail endpoint configured; would send '{}' to {} ({} attachment(s)):\n{}",
            message.subject,
            message.to,
            message.attachments.len(),
            message.text
        );
        Ok(())
    }
}

/// Pick the mailer for `config`: HTTP when an endpoint is set, logging otherwise.
pub fn mailer_from_config(config: &NotificationConfig) -> Result<Arc<dyn Mailer>> {
    match config.mail_endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => {
            let token = std::env::var(&config.mail_token_env).ok();
            if token.is_none() {
                log::warn!(
                    "{} is not set; mail requests will be unauthenticated",
                    config.mail_token_env
                );
            }
            Ok(Arc::new(HttpMailer::new(endpoint, token)?))
        }
        None => Ok(Arc::new(LogMailer)),
    }
}
