// src/pipeline/workflow.rs

//! Per-URL change detection.
//!
//! visit → classify → decide (loop or finalize) → load baseline → diff →
//! assemble → save baseline → notify → record.
//!
//! Cancellation is honoured up to the persistence step. Once the baseline
//! save begins, save and notification run to completion.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{
    Config, FailureKind, MailMessage, NotificationConfig, Outcome, OutputRecord, RecordStatus,
    Snapshot, UrlTask,
};
use crate::pipeline::classify::classify;
use crate::pipeline::diff::{ContentDiff, calculate_diff};
use crate::pipeline::notify::{NotificationAssembler, ReportDraft, failure_text};
use crate::pipeline::retry::{RetryDecision, RetryPolicy};
use crate::services::{Mailer, PageVisitor};
use crate::storage::{BaselineStore, BlobStore};

/// Final result of the visit loop.
#[derive(Debug)]
enum Finished {
    Success {
        content: String,
        screenshot: Snapshot,
        attempts: u32,
    },
    Failure {
        kind: FailureKind,
        message: String,
        fallback: Option<Snapshot>,
        attempts: u32,
    },
}

/// Runs the change-detection workflow for single pages.
pub struct Workflow {
    visitor: Arc<dyn PageVisitor>,
    baselines: BaselineStore,
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
    assembler: NotificationAssembler,
    notification: NotificationConfig,
}

impl Workflow {
    pub fn new(
        visitor: Arc<dyn PageVisitor>,
        baselines: BaselineStore,
        mailer: Arc<dyn Mailer>,
        policy: RetryPolicy,
        notification: NotificationConfig,
    ) -> Self {
        Self {
            visitor,
            baselines,
            mailer,
            policy,
            assembler: NotificationAssembler::new(),
            notification,
        }
    }

    /// Build a workflow from the crawler and notification settings.
    pub fn from_config(
        config: &Config,
        visitor: Arc<dyn PageVisitor>,
        store: Arc<dyn BlobStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self::new(
            visitor,
            BaselineStore::new(store),
            mailer,
            RetryPolicy::new(config.crawler.retry_strategy, config.crawler.max_retries),
            config.notification.clone(),
        )
    }

    pub fn with_assembler(mut self, assembler: NotificationAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Check one page and produce its output record.
    ///
    /// Returns [`AppError::Cancelled`] when `cancel` fires before the
    /// persistence step; nothing is written in that case.
    pub async fn run_task(&self, task: &UrlTask, cancel: &CancellationToken) -> Result<OutputRecord> {
        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            result = self.visit_until_final(task) => result?,
        };

        match finished {
            Finished::Success {
                content,
                screenshot,
                attempts,
            } => {
                self.finalize_success(task, content, screenshot, attempts, cancel)
                    .await
            }
            Finished::Failure {
                kind,
                message,
                fallback,
                attempts,
            } => {
                self.finalize_failure(task, kind, message, fallback, attempts, cancel)
                    .await
            }
        }
    }

    async fn visit_until_final(&self, task: &UrlTask) -> Result<Finished> {
        let max = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let visit = match self.visitor.visit(task).await {
                Ok(visit) => visit,
                Err(e) if is_navigation_error(&e) => {
                    log::warn!("{} attempt {}/{}: navigation failed: {}", task.url, attempt, max, e);
                    match self.policy.decide_transient(attempt) {
                        RetryDecision::Retry => continue,
                        _ => {
                            return Ok(Finished::Failure {
                                kind: FailureKind::CaptureFailure,
                                message: format!("navigation failed: {e}"),
                                fallback: None,
                                attempts: attempt,
                            });
                        }
                    }
                }
                Err(e) => return Err(e),
            };

            let outcome = match classify(task, visit) {
                Ok(outcome) => outcome,
                Err(e @ AppError::Capture { .. }) => {
                    log::error!("{} attempt {}/{}: {}", task.url, attempt, max, e);
                    return Ok(Finished::Failure {
                        kind: FailureKind::CaptureFailure,
                        message: e.to_string(),
                        fallback: None,
                        attempts: attempt,
                    });
                }
                Err(e) => return Err(e),
            };

            let decision = self.policy.decide(&outcome, attempt);
            log::info!(
                "{} attempt {}/{}: {} -> {:?}",
                task.url,
                attempt,
                max,
                outcome.describe(),
                decision
            );

            match (decision, outcome) {
                (RetryDecision::Retry, _) => continue,
                (RetryDecision::FinalSuccess, Outcome::Success { content, screenshot }) => {
                    return Ok(Finished::Success {
                        content,
                        screenshot,
                        attempts: attempt,
                    });
                }
                (_, outcome) => {
                    let kind = outcome
                        .failure_kind()
                        .unwrap_or(FailureKind::CaptureFailure);
                    let message = if attempt > 1 {
                        format!("{} after {} attempts", outcome.describe(), attempt)
                    } else {
                        outcome.describe()
                    };
                    let fallback = outcome.fallback_screenshot().cloned();
                    return Ok(Finished::Failure {
                        kind,
                        message,
                        fallback,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    async fn finalize_success(
        &self,
        task: &UrlTask,
        content: String,
        screenshot: Snapshot,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<OutputRecord> {
        let baseline = self.baselines.load(task).await?;
        let diff = calculate_diff(baseline.as_ref(), &content);
        log::info!("{}: {:?}", task.url, diff);

        let (previous_content, previous_screenshot) = match baseline {
            Some(b) => (b.content, b.screenshot),
            None => (None, None),
        };
        let previous_screenshot_url = previous_screenshot
            .as_ref()
            .map(|s| self.baselines.screenshot_url(task, s));
        let current_screenshot_url = self.baselines.screenshot_url(task, &screenshot);

        let report = diff.has_changes().then(|| {
            self.assembler.assemble(ReportDraft {
                task,
                previous_content: previous_content.as_deref().unwrap_or_default(),
                current_content: &content,
                previous_screenshot: previous_screenshot.as_ref(),
                current_screenshot: &screenshot,
                previous_screenshot_ref: previous_screenshot_url.clone(),
                current_screenshot_ref: Some(current_screenshot_url.clone()),
            })
        });

        if cancel.is_cancelled() {
            log::warn!("{}: cancelled before saving baseline", task.url);
            return Err(AppError::Cancelled);
        }

        self.baselines.save(task, &content, &screenshot).await?;

        let truncated = report.as_ref().is_some_and(|r| r.truncated);
        let notified = match (report, self.notification.send_to.as_deref()) {
            (Some(report), Some(to)) => {
                let message = report.into_message(to, self.notification.subject.clone());
                self.deliver(task, &message).await
            }
            (Some(_), None) => {
                log::info!("{}: changed, no recipient configured", task.url);
                false
            }
            (None, _) => false,
        };

        Ok(OutputRecord {
            url: task.url.clone(),
            status: match diff {
                ContentDiff::FirstRun => RecordStatus::FirstRun,
                ContentDiff::Unchanged => RecordStatus::Unchanged,
                ContentDiff::Changed => RecordStatus::Changed,
            },
            is_first_run: diff == ContentDiff::FirstRun,
            previous_data: previous_content,
            content: Some(content),
            previous_screenshot_url,
            current_screenshot_url: Some(current_screenshot_url),
            attempts,
            notified,
            truncated,
            failure: None,
            checked_at: Utc::now(),
        })
    }

    async fn finalize_failure(
        &self,
        task: &UrlTask,
        kind: FailureKind,
        message: String,
        fallback: Option<Snapshot>,
        attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<OutputRecord> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        log::warn!("{}: {} ({})", task.url, kind, message);

        let screenshot_url = match &fallback {
            Some(shot) => match self.baselines.save_failure_snapshot(task, shot).await {
                Ok(url) => Some(url),
                Err(e) => {
                    log::warn!("{}: could not store failure screenshot: {}", task.url, e);
                    None
                }
            },
            None => None,
        };

        let mut record = OutputRecord::failed(&task.url, kind, &message, attempts);
        record.current_screenshot_url = screenshot_url.clone();
        record.is_first_run = match self.baselines.exists(task).await {
            Ok(exists) => !exists,
            Err(e) => {
                log::warn!("{}: could not check for a baseline: {}", task.url, e);
                false
            }
        };

        if self.notification.notify_on_failure && kind != FailureKind::PermanentMissing {
            if let Some(to) = self.notification.send_to.as_deref() {
                let mail = MailMessage {
                    to: to.to_string(),
                    subject: self.notification.failure_subject.clone(),
                    text: failure_text(task, kind, &message, attempts, screenshot_url.as_deref()),
                    attachments: Vec::new(),
                };
                record.notified = self.deliver(task, &mail).await;
            }
        }

        Ok(record)
    }

    async fn deliver(&self, task: &UrlTask, message: &MailMessage) -> bool {
        match self.mailer.send(message).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("{}: mail delivery failed: {}", task.url, e);
                false
            }
        }
    }
}

/// Errors from the visitor that count as a failed navigation.
fn is_navigation_error(err: &AppError) -> bool {
    matches!(
        err,
        AppError::Http(_) | AppError::Io(_) | AppError::Crawl { .. }
    )
}
