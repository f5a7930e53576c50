//! Baseline persistence per watched URL.
//!
//! The screenshot is written first under a content-addressed key, then the
//! manifest naming it. The manifest write is the commit point: a run
//! interrupted before it leaves the previous baseline intact, and a reader
//! never sees new content paired with an old screenshot.
//!
//! Each URL keeps at most two screenshots: the current one and the one it
//! replaced, which stays linked from the last change report. Older ones are
//! removed after the commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Snapshot, TaskKey, UrlTask};
use crate::storage::{BlobStore, get_json, put_json};

const MANIFEST: &str = "baseline.json";

/// Last committed state of a watched page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Baseline {
    pub content: Option<String>,
    pub screenshot: Option<Snapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    url: String,
    content: Option<String>,
    screenshot_key: Option<String>,
    #[serde(default)]
    screenshot_content_type: Option<String>,
    #[serde(default)]
    previous_screenshot_key: Option<String>,
    updated_at: DateTime<Utc>,
}

/// Reads and writes baselines in a [`BlobStore`].
#[derive(Clone)]
pub struct BaselineStore {
    store: Arc<dyn BlobStore>,
}

impl BaselineStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    fn manifest_key(key: &TaskKey) -> String {
        format!("{key}/{MANIFEST}")
    }

    fn screenshot_key(key: &TaskKey, snapshot: &Snapshot) -> String {
        format!("{key}/screenshots/{}.{}", snapshot.digest(), snapshot.extension())
    }

    fn failure_key(key: &TaskKey, snapshot: &Snapshot) -> String {
        format!("{key}/failures/latest.{}", snapshot.extension())
    }

    async fn manifest(&self, key: &TaskKey) -> Result<Option<Manifest>> {
        get_json(self.store.as_ref(), &Self::manifest_key(key)).await
    }

    /// Whether a baseline has ever been committed for `task`.
    pub async fn exists(&self, task: &UrlTask) -> Result<bool> {
        Ok(self.manifest(&task.key()).await?.is_some())
    }

    /// Load the baseline for `task`, or `None` on a first run.
    ///
    /// A manifest whose screenshot object is gone yields a baseline without
    /// a screenshot.
    pub async fn load(&self, task: &UrlTask) -> Result<Option<Baseline>> {
        let key = task.key();
        let Some(manifest) = self.manifest(&key).await? else {
            return Ok(None);
        };

        let screenshot = match manifest.screenshot_key {
            Some(shot_key) => match self.store.get(&shot_key).await? {
                Some(data) => {
                    let content_type = manifest
                        .screenshot_content_type
                        .unwrap_or_else(|| "application/octet-stream".to_string());
                    Some(Snapshot::new(data, content_type))
                }
                None => {
                    log::warn!(
                        "Baseline for {} references missing screenshot {}",
                        task.url,
                        shot_key
                    );
                    None
                }
            },
            None => None,
        };

        Ok(Some(Baseline {
            content: manifest.content,
            screenshot,
        }))
    }

    /// Commit `content` and `screenshot` as the new baseline.
    ///
    /// Returns the public reference of the stored screenshot.
    pub async fn save(&self, task: &UrlTask, content: &str, screenshot: &Snapshot) -> Result<String> {
        let key = task.key();
        let shot_key = Self::screenshot_key(&key, screenshot);
        let old = self.manifest(&key).await?;
        let replaced = old
            .as_ref()
            .and_then(|m| m.screenshot_key.clone())
            .filter(|k| *k != shot_key);

        self.store
            .put(&shot_key, screenshot.data.clone(), &screenshot.content_type)
            .await?;

        let manifest = Manifest {
            url: task.url.clone(),
            content: Some(content.to_string()),
            screenshot_key: Some(shot_key.clone()),
            screenshot_content_type: Some(screenshot.content_type.clone()),
            previous_screenshot_key: replaced.clone(),
            updated_at: Utc::now(),
        };
        put_json(self.store.as_ref(), &Self::manifest_key(&key), &manifest).await?;
        log::info!("Baseline updated for {} ({})", task.url, key);

        let stale = old
            .and_then(|m| m.previous_screenshot_key)
            .filter(|k| *k != shot_key && Some(k) != replaced.as_ref());
        if let Some(stale) = stale {
            if let Err(e) = self.store.delete(&stale).await {
                log::warn!("Could not remove stale screenshot {}: {}", stale, e);
            }
        }

        Ok(self.store.public_url(&shot_key))
    }

    /// Store the full-page screenshot of a failed check, replacing the
    /// previous failure screenshot. The baseline is untouched.
    pub async fn save_failure_snapshot(&self, task: &UrlTask, snapshot: &Snapshot) -> Result<String> {
        let shot_key = Self::failure_key(&task.key(), snapshot);
        self.store
            .put(&shot_key, snapshot.data.clone(), &snapshot.content_type)
            .await?;
        Ok(self.store.public_url(&shot_key))
    }

    /// Public reference of a baseline screenshot.
    pub fn screenshot_url(&self, task: &UrlTask, snapshot: &Snapshot) -> String {
        self.store
            .public_url(&Self::screenshot_key(&task.key(), snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, BaselineStore) {
        let memory = Arc::new(MemoryStore::new());
        let baselines = BaselineStore::new(memory.clone());
        (memory, baselines)
    }

    fn task() -> UrlTask {
        UrlTask::new("https://example.com/p", ".price")
    }

    #[tokio::test]
    async fn test_first_run_is_none() {
        let (_, baselines) = setup();
        assert!(baselines.load(&task()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (memory, baselines) = setup();
        let shot = Snapshot::png(vec![9, 9, 9]);

        let url = baselines.save(&task(), "10 EUR", &shot).await.unwrap();
        assert_eq!(url, baselines.screenshot_url(&task(), &shot));

        let loaded = baselines.load(&task()).await.unwrap().unwrap();
        assert_eq!(loaded.content.as_deref(), Some("10 EUR"));
        assert_eq!(loaded.screenshot, Some(shot.clone()));

        let key = task().key();
        let keys = memory.keys().await;
        assert!(keys.contains(&format!("{key}/baseline.json")));
        assert!(keys.contains(&format!("{key}/screenshots/{}.png", shot.digest())));
    }

    #[tokio::test]
    async fn test_screenshot_without_manifest_is_not_a_baseline() {
        let (memory, baselines) = setup();
        let shot = Snapshot::png(vec![1]);
        let key = task().key();
        memory
            .put(&format!("{key}/screenshots/{}.png", shot.digest()), shot.data.clone(), "image/png")
            .await
            .unwrap();

        assert!(baselines.load(&task()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_screenshot_object() {
        let (memory, baselines) = setup();
        let key = task().key();
        let manifest = serde_json::json!({
            "url": "https://example.com/p",
            "content": "x",
            "screenshotKey": format!("{key}/screenshots/gone.png"),
            "screenshotContentType": "image/png",
            "updatedAt": "2026-01-01T00:00:00Z"
        });
        put_json(&*memory, &format!("{key}/baseline.json"), &manifest)
            .await
            .unwrap();

        let loaded = baselines.load(&task()).await.unwrap().unwrap();
        assert_eq!(loaded.content.as_deref(), Some("x"));
        assert!(loaded.screenshot.is_none());
    }

    #[tokio::test]
    async fn test_failure_snapshot_leaves_baseline() {
        let (_, baselines) = setup();
        let shot = Snapshot::png(vec![1]);
        baselines.save(&task(), "a", &shot).await.unwrap();

        let url = baselines
            .save_failure_snapshot(&task(), &Snapshot::png(vec![2]))
            .await
            .unwrap();
        assert!(url.contains("/failures/"));

        let loaded = baselines.load(&task()).await.unwrap().unwrap();
        assert_eq!(loaded.content.as_deref(), Some("a"));
        assert_eq!(loaded.screenshot, Some(shot));
    }

    #[tokio::test]
    async fn test_keeps_current_and_replaced_screenshots_only() {
        let (memory, baselines) = setup();
        for i in 0..5u8 {
            baselines
                .save(&task(), &format!("v{i}"), &Snapshot::png(vec![i]))
                .await
                .unwrap();
        }

        let key = task().key();
        let shots: Vec<String> = memory
            .keys()
            .await
            .into_iter()
            .filter(|k| k.contains("/screenshots/"))
            .collect();
        assert_eq!(
            shots,
            {
                let mut want = vec![
                    format!("{key}/screenshots/{}.png", Snapshot::png(vec![3]).digest()),
                    format!("{key}/screenshots/{}.png", Snapshot::png(vec![4]).digest()),
                ];
                want.sort();
                want
            }
        );
        let current = format!("{key}/screenshots/{}.png", Snapshot::png(vec![4]).digest());
        assert_eq!(memory.content_type(&current).await.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_same_screenshot_is_not_removed() {
        let (memory, baselines) = setup();
        let shot = Snapshot::png(vec![1]);
        for content in ["a", "b", "c"] {
            baselines.save(&task(), content, &shot).await.unwrap();
        }

        let loaded = baselines.load(&task()).await.unwrap().unwrap();
        assert_eq!(loaded.screenshot, Some(shot));
        assert_eq!(memory.len().await, 2);
    }

    #[tokio::test]
    async fn test_failure_snapshots_are_bounded() {
        let (memory, baselines) = setup();
        for i in 0..4u8 {
            baselines
                .save_failure_snapshot(&task(), &Snapshot::png(vec![i]))
                .await
                .unwrap();
        }
        assert_eq!(memory.keys().await, vec![format!("{}/failures/latest.png", task().key())]);
    }

    #[tokio::test]
    async fn test_exists() {
        let (_, baselines) = setup();
        assert!(!baselines.exists(&task()).await.unwrap());
        baselines.save(&task(), "a", &Snapshot::png(vec![1])).await.unwrap();
        assert!(baselines.exists(&task()).await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_urls_do_not_collide() {
        let (_, baselines) = setup();
        let a = UrlTask::new("https://example.com/a", "p");
        let b = UrlTask::new("https://example.com/b", "p");
        baselines.save(&a, "A", &Snapshot::png(vec![1])).await.unwrap();
        baselines.save(&b, "B", &Snapshot::png(vec![1])).await.unwrap();

        assert_eq!(baselines.load(&a).await.unwrap().unwrap().content.as_deref(), Some("A"));
        assert_eq!(baselines.load(&b).await.unwrap().unwrap().content.as_deref(), Some("B"));
    }
}
