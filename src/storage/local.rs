//! Local filesystem storage implementation.
//!
//! Used for development, the CLI and tests. Production deployments use
//! `S3Storage`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{BlobStore, join_public_url};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    public_base_url: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            public_base_url: None,
        }
    }

    /// Serve public references from `base` instead of `file://` paths.
    pub fn with_public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.read_bytes(key).await
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.write_bytes(key, &bytes).await?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), self.path(key).display());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => {
                log::debug!("Removed {}", self.path(key).display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => join_public_url(base, key),
            None => format!("file://{}", self.path(key).display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.put("a/b/test.txt", b"hello".to_vec(), "text/plain").await.unwrap();
        let data = storage.get("a/b/test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.get("nope.txt").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.put("k.json", b"1".to_vec(), "application/json").await.unwrap();
        storage.put("k.json", b"2".to_vec(), "application/json").await.unwrap();

        assert_eq!(storage.get("k.json").await.unwrap(), Some(b"2".to_vec()));
        assert!(!tmp.path().join("k.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_delete() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.put("a/gone.png", vec![1], "image/png").await.unwrap();
        storage.delete("a/gone.png").await.unwrap();
        assert!(storage.get("a/gone.png").await.unwrap().is_none());
        storage.delete("a/gone.png").await.unwrap();
    }

    #[test]
    fn test_public_url() {
        let storage = LocalStorage::new("/data");
        assert_eq!(storage.public_url("x/y.png"), "file:///data/x/y.png");

        let storage = storage.with_public_base_url(Some("https://shots.test/".into()));
        assert_eq!(storage.public_url("x/y.png"), "https://shots.test/x/y.png");
    }
}
