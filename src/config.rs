// src/config.rs

//! Configuration loading utilities.
//!
//! Configuration comes from a TOML file (or a `config.toml` object in the
//! blob store), optionally overridden by a JSON run input.

use std::path::Path;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Config, MonitorInput};
use crate::storage::BlobStore;

/// Loads `config.toml` from a blob store prefix.
pub struct StoreConfigLoader {
    store: Arc<dyn BlobStore>,
    prefix: String,
}

impl StoreConfigLoader {
    pub fn new(store: Arc<dyn BlobStore>, config_prefix: &str) -> Self {
        Self {
            store,
            prefix: config_prefix.trim_matches('/').to_string(),
        }
    }

    fn key(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }

    /// Load `config.toml`, or `None` when the object doesn't exist.
    pub async fn load_config(&self) -> Result<Option<Config>> {
        let key = self.key("config.toml");
        log::info!("Loading config from store: {}", key);
        let Some(bytes) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let text = String::from_utf8(bytes).map_err(|e| {
            AppError::config(format!("Config file {key} is not valid UTF-8: {e}"))
        })?;
        Config::from_toml(&text).map(Some)
    }

    /// Like [`load_config`](Self::load_config), falling back to defaults.
    pub async fn load_config_or_default(&self) -> Result<Config> {
        match self.load_config().await? {
            Some(config) => Ok(config),
            None => {
                log::warn!("No config.toml in store, using defaults.");
                Ok(Config::default())
            }
        }
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path)
    } else {
        log::warn!("Config file {path:?} not found, using defaults.");
        Ok(Config::default())
    }
}

/// Load a JSON run input file.
pub fn load_input(path: &Path) -> Result<MonitorInput> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Apply `input` on top of `config` and validate the result.
pub fn merge_and_validate(config: Config, input: Option<MonitorInput>) -> Result<Config> {
    let config = match input {
        Some(input) => input.apply(config),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use tempfile::TempDir;

    const TOML: &str = r##"
[crawler]
max_retries = 2

[[tasks]]
url = "https://example.com/a"
contentSelector = "#a"
"##;

    #[tokio::test]
    async fn test_store_loader() {
        let store = Arc::new(MemoryStore::new());
        store
            .put("cfg/config.toml", TOML.as_bytes().to_vec(), "application/toml")
            .await
            .unwrap();

        let loader = StoreConfigLoader::new(store, "/cfg/");
        let config = loader.load_config().await.unwrap().unwrap();
        assert_eq!(config.crawler.max_retries, 2);
        assert_eq!(config.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_store_loader_missing_falls_back() {
        let loader = StoreConfigLoader::new(Arc::new(MemoryStore::new()), "cfg");
        assert!(loader.load_config().await.unwrap().is_none());
        let config = loader.load_config_or_default().await.unwrap();
        assert!(config.tasks.is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config.crawler.max_retries, 5);
    }

    #[test]
    fn test_merge_input_and_validate() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("input.json");
        std::fs::write(
            &path,
            r##"{"urls":[{"url":"https://example.com/b","contentSelector":"#b"}],"retryStrategy":"never-retry"}"##,
        )
        .unwrap();

        let input = load_input(&path).unwrap();
        let config = merge_and_validate(Config::default(), Some(input)).unwrap();
        assert_eq!(config.tasks[0].url, "https://example.com/b");
    }

    #[test]
    fn test_merge_rejects_empty_tasks() {
        assert!(merge_and_validate(Config::default(), None).is_err());
    }
}
