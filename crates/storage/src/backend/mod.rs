//! Remote transport trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the contract a remote build
//! cache must satisfy for artifacts to be fetched on demand. Implementations
//! are provided for a local directory (a disk cache shared between
//! workspaces), S3-compatible object storage, and an in-memory mock for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::HashId;
use crate::error::Result;
use async_trait::async_trait;

/// Unified interface for content-addressed blob transports.
///
/// Every blob is addressed by its [`HashId`]; backends never interpret the
/// bytes. Timeout and retry policy is the backend's own business (the S3
/// backend configures the SDK's exponential back-off, for example). Callers
/// treat any failure as "not available right now".
///
/// # Examples
///
/// ```
/// use outsync_storage::{HashId, backend::StorageBackend, error::Result};
///
/// async fn size_of_blob(backend: &dyn StorageBackend, hash: &HashId) -> Result<u64> {
///     if backend.exists(hash).await? {
///         let data = backend.fetch(hash).await?;
///         Ok(data.len() as u64)
///     } else {
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Only used for logging, so it does not
    /// strictly need to be unique.
    fn name(&self) -> &str;

    /// Check if a blob exists.
    async fn exists(&self, hash: &HashId) -> Result<bool>;

    /// Fetch the complete contents of a blob.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the backend
    /// has no blob stored under `hash`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use outsync_storage::HashId;
    /// # use outsync_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let hash = HashId::new("9f86d081884c7d659a2feaa0c55ad015")?;
    /// let data = backend.fetch(&hash).await?;
    /// println!("Fetched {} bytes", data.len());
    /// # Ok(())
    /// # }
    /// ```
    async fn fetch(&self, hash: &HashId) -> Result<Vec<u8>>;

    /// Store a blob.
    ///
    /// Storing the same hash twice is harmless: the hash guarantees the
    /// contents are identical.
    ///
    /// # Notes
    /// - Backends do not verify that `data` actually hashes to `hash`; remote
    ///   caches use hashing schemes this crate knows nothing about.
    async fn store(&self, hash: &HashId, data: &[u8]) -> Result<()>;
}
