//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, MinIO, Backblaze B2, and others. Remote build
//! caches are commonly backed by a bucket holding one object per content
//! hash; that is the layout expected here (`<prefix>/<hash>`).
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.

use crate::error::{ErrorKind, Result};
use crate::{HashId, StorageBackend};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    primitives::ByteStream,
};
use exn::ResultExt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::instrument;

/// Generous default for concurrent S3 requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 100;

/// S3-compatible storage backend.
///
/// Stores blobs in an S3 bucket, optionally under a key prefix.
///
/// # Examples
///
/// ```no_run
/// use outsync_storage::backend::S3Backend;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = S3Backend::new(
///     "build-cache",
///     "my-bucket",
///     Some("cas/".to_string()),
///     "us-east-1",
///     None::<String>,
///     "access_key_id",
///     "secret_access_key",
/// ).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
    /// Rate limiter for concurrent S3 requests.
    rate_limiter: Arc<Semaphore>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub async fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let prefix = prefix.map(|p| p.trim_matches('/').to_string()).filter(|p| !p.is_empty());
        let credentials = Credentials::new(key_id, key_secret, None, None, "outsync-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Configure retry policy with exponential backoff (1 initial + 3 retries)
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Use path-style addressing for better compatibility with
            // S3-compatible services (MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            prefix,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        })
    }

    /// Acquire a rate limiter permit before making an S3 API call.
    async fn acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
        // The semaphore is never closed, but don't unwrap on it anyway.
        self.rate_limiter
            .clone()
            .acquire_owned()
            .await
            .or_raise(|| ErrorKind::BackendError("S3 rate limiter closed".to_string()))
    }
}

/// Construct the full S3 key for a hash.
fn object_key(prefix: Option<&str>, hash: &HashId) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}/{hash}"),
        None => hash.to_string(),
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, hash: &HashId) -> Result<bool> {
        let _permit = self.acquire_permit().await?;
        let key = object_key(self.prefix.as_deref(), hash);
        match self.client.head_object().bucket(&self.bucket).key(&key).send().await {
            Ok(_) => Ok(true),
            Err(err) => match err.into_service_error() {
                e if e.is_not_found() => Ok(false),
                e => exn::bail!(ErrorKind::Network(e.to_string())),
            },
        }
    }

    #[instrument(skip(self), fields(backend = %self.name))]
    async fn fetch(&self, hash: &HashId) -> Result<Vec<u8>> {
        let _permit = self.acquire_permit().await?;
        let key = object_key(self.prefix.as_deref(), hash);
        let output = match self.client.get_object().bucket(&self.bucket).key(&key).send().await {
            Ok(output) => output,
            Err(err) => match err.into_service_error() {
                e if e.is_no_such_key() => exn::bail!(ErrorKind::NotFound(hash.clone())),
                e => exn::bail!(ErrorKind::Network(e.to_string())),
            },
        };
        let body = output.body.collect().await.or_raise(|| ErrorKind::Network(format!("reading body of {key}")))?;
        Ok(body.into_bytes().to_vec())
    }

    #[instrument(skip(self, data), fields(backend = %self.name, bytes = data.len()))]
    async fn store(&self, hash: &HashId, data: &[u8]) -> Result<()> {
        let _permit = self.acquire_permit().await?;
        let key = object_key(self.prefix.as_deref(), hash);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .or_raise(|| ErrorKind::Network(format!("uploading {key}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_without_prefix() {
        let hash = HashId::new("abc123").unwrap();
        assert_eq!(object_key(None, &hash), "abc123");
    }

    #[test]
    fn test_object_key_with_prefix() {
        let hash = HashId::new("abc123").unwrap();
        assert_eq!(object_key(Some("cas"), &hash), "cas/abc123");
    }
}
