// src/pipeline/monitor.rs

//! Concurrent run driver.
//!
//! Every URL runs as its own task and reports exactly one message on a
//! channel. The collector is the only place records are pushed to the sink.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{FailureKind, OutputRecord, RecordStatus, UrlTask};
use crate::pipeline::workflow::Workflow;
use crate::services::RecordSink;

/// Tally of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub first_run: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub failed: usize,
    pub notified: usize,
    pub cancelled: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    fn record(&mut self, record: &OutputRecord) {
        match record.status {
            RecordStatus::FirstRun => self.first_run += 1,
            RecordStatus::Unchanged => self.unchanged += 1,
            RecordStatus::Changed => self.changed += 1,
            RecordStatus::Failed => self.failed += 1,
        }
        if record.notified {
            self.notified += 1;
        }
    }
}

struct TaskMessage {
    task: UrlTask,
    result: Result<OutputRecord>,
}

/// Run every task once, at most `max_concurrent` at a time.
///
/// Per-URL errors and panics become failure records. Cancelled URLs emit
/// no record and are counted in [`RunSummary::cancelled`].
pub async fn run_monitor(
    workflow: Arc<Workflow>,
    tasks: Vec<UrlTask>,
    max_concurrent: usize,
    sink: Arc<dyn RecordSink>,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut summary = RunSummary {
        total: tasks.len(),
        ..RunSummary::default()
    };
    log::info!(
        "Checking {} page(s), {} at a time",
        tasks.len(),
        max_concurrent.max(1)
    );

    let (tx, mut rx) = mpsc::channel::<TaskMessage>(tasks.len().max(1));
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));

    for task in tasks {
        let tx = tx.clone();
        let semaphore = Arc::clone(&semaphore);
        let workflow = Arc::clone(&workflow);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.acquire_owned() => permit.ok(),
            };
            let result = match permit {
                Some(_permit) => run_isolated(workflow, task.clone(), cancel).await,
                None => Err(AppError::Cancelled),
            };
            let _ = tx.send(TaskMessage { task, result }).await;
        });
    }
    drop(tx);

    while let Some(TaskMessage { task, result }) = rx.recv().await {
        let record = match result {
            Ok(record) => record,
            Err(AppError::Cancelled) => {
                log::warn!("{}: cancelled", task.url);
                summary.cancelled += 1;
                continue;
            }
            Err(e) => {
                log::error!("{}: {}", task.url, e);
                OutputRecord::failed(&task.url, FailureKind::CaptureFailure, e.to_string(), 0)
            }
        };

        if let Err(e) = sink.push(&record).await {
            log::error!("{}: failed to push output record: {}", task.url, e);
        }
        summary.record(&record);
    }

    summary.duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Run finished in {}ms: {} first-run, {} unchanged, {} changed, {} failed, {} cancelled, {} mail(s)",
        summary.duration_ms,
        summary.first_run,
        summary.unchanged,
        summary.changed,
        summary.failed,
        summary.cancelled,
        summary.notified
    );
    Ok(summary)
}

/// Run one workflow on its own task so a panic surfaces as an error for
/// that URL instead of losing its record.
async fn run_isolated(
    workflow: Arc<Workflow>,
    task: UrlTask,
    cancel: CancellationToken,
) -> Result<OutputRecord> {
    let url = task.url.clone();
    let handle = tokio::spawn(async move { workflow.run_task(&task, &cancel).await });
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(AppError::crawl(url, "workflow panicked")),
        Err(e) => Err(AppError::crawl(url, e)),
    }
}
