//! Storage abstractions for baselines and screenshots.
//!
//! All persistent state lives in a key-value blob store. Keys are plain
//! `/`-separated paths:
//!
//! ```text
//! {root}/
//! ├── config.toml                     # Monitor configuration
//! └── {task_key}/                     # One directory per watched URL
//!     ├── baseline.json               # Manifest: content + screenshot refs
//!     ├── screenshots/{digest}.png    # Current and previous element shots
//!     └── failures/latest.png         # Full-page shot of the last failure
//! ```

mod baseline;
pub mod local;
mod memory;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::Result;

pub use baseline::{Baseline, BaselineStore};
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Trait for blob storage backends.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read an object, returning `None` if it doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write an object. A completed write replaces the previous value whole.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Remove an object. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Publicly reachable reference to an object.
    fn public_url(&self, key: &str) -> String;
}

/// Read and decode a JSON object.
pub async fn get_json<T: DeserializeOwned>(store: &dyn BlobStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON object.
pub async fn put_json<T: Serialize + ?Sized>(
    store: &dyn BlobStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.put(key, bytes, "application/json").await
}

/// Join a public base URL and an object key.
pub(crate) fn join_public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        let sample = Sample {
            name: "a".into(),
            count: 3,
        };
        put_json(&store, "x/sample.json", &sample).await.unwrap();

        let loaded: Option<Sample> = get_json(&store, "x/sample.json").await.unwrap();
        assert_eq!(loaded, Some(sample));

        let missing: Option<Sample> = get_json(&store, "nope.json").await.unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_join_public_url() {
        assert_eq!(join_public_url("https://cdn.test/", "/a/b.png"), "https://cdn.test/a/b.png");
        assert_eq!(join_public_url("https://cdn.test", "a"), "https://cdn.test/a");
    }
}
