use std::sync::Arc;

use pagewatch::models::{Snapshot, UrlTask};
use pagewatch::storage::{BaselineStore, BlobStore, LocalStorage};
use tempfile::TempDir;

fn task() -> UrlTask {
    UrlTask::new("https://example.com/watch?id=7", "#main")
}

#[tokio::test]
async fn baseline_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let shot = Snapshot::png(vec![7; 64]);

    {
        let baselines = BaselineStore::new(Arc::new(LocalStorage::new(tmp.path())));
        baselines.save(&task(), "content v1", &shot).await.unwrap();
    }

    let baselines = BaselineStore::new(Arc::new(LocalStorage::new(tmp.path())));
    let loaded = baselines.load(&task()).await.unwrap().unwrap();
    assert_eq!(loaded.content.as_deref(), Some("content v1"));
    assert_eq!(loaded.screenshot, Some(shot));
}

#[tokio::test]
async fn empty_content_is_not_first_run() {
    let tmp = TempDir::new().unwrap();
    let baselines = BaselineStore::new(Arc::new(LocalStorage::new(tmp.path())));

    assert!(baselines.load(&task()).await.unwrap().is_none());
    baselines
        .save(&task(), "", &Snapshot::png(vec![1]))
        .await
        .unwrap();
    let loaded = baselines.load(&task()).await.unwrap().unwrap();
    assert_eq!(loaded.content.as_deref(), Some(""));
}

#[tokio::test]
async fn orphan_screenshot_leaves_previous_baseline() {
    let tmp = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(tmp.path()));
    let baselines = BaselineStore::new(storage.clone());
    let old = Snapshot::png(vec![1]);
    baselines.save(&task(), "old", &old).await.unwrap();

    // a run interrupted after the screenshot write but before the manifest
    let new = Snapshot::png(vec![2]);
    let key = format!("{}/screenshots/{}.png", task().key(), new.digest());
    storage.put(&key, new.data.clone(), "image/png").await.unwrap();

    let loaded = baselines.load(&task()).await.unwrap().unwrap();
    assert_eq!(loaded.content.as_deref(), Some("old"));
    assert_eq!(loaded.screenshot, Some(old));
}

#[tokio::test]
async fn public_urls_use_configured_base() {
    let tmp = TempDir::new().unwrap();
    let storage = LocalStorage::new(tmp.path())
        .with_public_base_url(Some("https://shots.example.com/pw".into()));
    let baselines = BaselineStore::new(Arc::new(storage));
    let shot = Snapshot::png(vec![3]);

    let url = baselines.save(&task(), "x", &shot).await.unwrap();
    assert_eq!(
        url,
        format!(
            "https://shots.example.com/pw/{}/screenshots/{}.png",
            task().key(),
            shot.digest()
        )
    );
}
