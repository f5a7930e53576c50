// src/lambda/mod.rs

//! AWS Lambda handler for the monitor.
//!
//! This module provides the Lambda function entry point that:
//! 1. Loads `config.toml` from S3 (falls back to defaults)
//! 2. Applies the invocation payload on top of it
//! 3. Checks every page against its baseline in S3
//! 4. Returns the output records and a run summary

use std::sync::Arc;

use lambda_runtime::{Error as LambdaError, LambdaEvent};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::{StoreConfigLoader, merge_and_validate};
use crate::error::Result;
use crate::models::{MonitorInput, OutputRecord};
use crate::pipeline::{RunSummary, Workflow, run_monitor};
use crate::services::{HttpVisitor, MarkerBlockDetector, MemorySink, mailer_from_config};
use crate::storage::BlobStore;
use crate::storage::s3::S3Storage;

/// Lambda response payload.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorResponse {
    /// Whether the run completed
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,

    /// One record per checked page
    pub records: Vec<OutputRecord>,

    /// Error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

/// Main Lambda handler function.
#[instrument(skip(event))]
pub async fn handler(
    event: LambdaEvent<MonitorInput>,
) -> std::result::Result<MonitorResponse, LambdaError> {
    let start = std::time::Instant::now();
    let (input, _context) = event.into_parts();

    info!(
        "Starting run: {} url(s) in payload, strategy={:?}",
        input.urls.len(),
        input.retry_strategy
    );

    match run(input).await {
        Ok(mut response) => {
            response.success = true;
            response.execution_time_ms = start.elapsed().as_millis() as u64;
            info!(
                "Run completed: {} record(s) in {}ms",
                response.records.len(),
                response.execution_time_ms
            );
            Ok(response)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(MonitorResponse {
                success: false,
                error: Some(e.to_string()),
                execution_time_ms: start.elapsed().as_millis() as u64,
                ..Default::default()
            })
        }
    }
}

async fn run(input: MonitorInput) -> Result<MonitorResponse> {
    let store: Arc<dyn BlobStore> = Arc::new(S3Storage::from_env().await?);

    let prefix = std::env::var("CONFIG_S3_PREFIX").unwrap_or_else(|_| "config".to_string());
    let base = StoreConfigLoader::new(Arc::clone(&store), &prefix)
        .load_config_or_default()
        .await?;
    let config = merge_and_validate(base, Some(input))?;

    let store: Arc<dyn BlobStore> = match config.storage.public_base_url.clone() {
        Some(url) => Arc::new(S3Storage::from_env().await?.with_public_base_url(Some(url))),
        None => store,
    };

    let detector = Arc::new(MarkerBlockDetector::new(&config.crawler.block_markers)?);
    let visitor = Arc::new(HttpVisitor::new(&config.crawler, detector)?);
    let mailer = mailer_from_config(&config.notification)?;
    let workflow = Arc::new(Workflow::from_config(&config, visitor, store, mailer));
    let sink = Arc::new(MemorySink::new());

    let summary = run_monitor(
        workflow,
        config.tasks.clone(),
        config.crawler.max_concurrent,
        sink.clone(),
        CancellationToken::new(),
    )
    .await?;

    Ok(MonitorResponse {
        success: true,
        summary: Some(summary),
        records: sink.drain().await,
        ..Default::default()
    })
}
