//! AWS S3 storage implementation.
//!
//! Objects live under `{bucket}/{prefix}/{key}`. Single PUTs replace an
//! object atomically, which the baseline manifest relies on.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::storage::{BlobStore, join_public_url};

/// S3-based blob storage.
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3 storage instance.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            public_base_url: None,
        }
    }

    /// Create S3 storage from environment configuration.
    ///
    /// Reads `PAGEWATCH_BUCKET`, `PAGEWATCH_PREFIX` and
    /// `PAGEWATCH_PUBLIC_BASE_URL`.
    pub async fn from_env() -> Result<Self> {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let bucket = std::env::var("PAGEWATCH_BUCKET")
            .map_err(|_| AppError::config("PAGEWATCH_BUCKET is not set"))?;
        let prefix = std::env::var("PAGEWATCH_PREFIX").unwrap_or_else(|_| "pagewatch".to_string());

        Ok(Self::new(client, bucket, prefix)
            .with_public_base_url(std::env::var("PAGEWATCH_PUBLIC_BASE_URL").ok()))
    }

    pub fn with_public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.filter(|b| !b.trim().is_empty());
        self
    }

    fn object_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }
}

#[async_trait]
impl BlobStore for S3Storage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let object_key = self.object_key(key);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(AppError::store)?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::debug!("No object at s3://{}/{}", self.bucket, object_key);
                    Ok(None)
                } else {
                    Err(AppError::store(service_err))
                }
            }
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let object_key = self.object_key(key);
        let len = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::store(e.into_service_error()))?;

        log::info!("Wrote {} bytes to s3://{}/{}", len, self.bucket, object_key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let object_key = self.object_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| AppError::store(e.into_service_error()))?;

        log::debug!("Removed s3://{}/{}", self.bucket, object_key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => join_public_url(base, key),
            None => format!(
                "https://{}.s3.amazonaws.com/{}",
                self.bucket,
                self.object_key(key)
            ),
        }
    }
}
