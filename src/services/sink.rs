//! Output record sinks.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::OutputRecord;

/// Receives one record per URL per run.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn push(&self, record: &OutputRecord) -> Result<()>;
}

/// Appends records as JSON lines to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn push(&self, record: &OutputRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<OutputRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records pushed so far.
    pub async fn records(&self) -> Vec<OutputRecord> {
        self.records.lock().await.clone()
    }

    /// Take all records, leaving the sink empty.
    pub async fn drain(&self) -> Vec<OutputRecord> {
        std::mem::take(&mut *self.records.lock().await)
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn push(&self, record: &OutputRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }
}
