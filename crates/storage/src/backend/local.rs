//! Local directory storage backend.
//!
//! This module provides a storage backend implementation for a directory on the
//! local filesystem, laid out like a disk cache: every blob lives at
//! `<root>/<shard>/<hash>` where the shard is the first two characters of the
//! hash. Files are accessed via `tokio::fs` for async I/O.

use crate::error::{ErrorKind, Result};
use crate::{HashId, StorageBackend};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

/// Local directory storage backend.
///
/// # Examples
///
/// ```no_run
/// use outsync_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("disk-cache", "/var/cache/build/cas")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the content-addressed store
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local directory backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the store's root directory; created if it
    ///   does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute or is not a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Use non-async here; it'll only happen once on startup and it's
            // not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root, None))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Location of a blob on disk.
    fn object_path(&self, hash: &HashId) -> PathBuf {
        self.root.join(hash.shard()).join(hash.as_str())
    }

    fn map_io_error(e: std::io::Error, path: &Path, hash: Option<&HashId>) -> ErrorKind {
        match (e.kind(), hash) {
            (std::io::ErrorKind::NotFound, Some(hash)) => ErrorKind::NotFound(hash.clone()),
            (std::io::ErrorKind::PermissionDenied, _) => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, hash: &HashId) -> Result<bool> {
        let path = self.object_path(hash);
        Ok(fs::try_exists(&path).await.map_err(|e| Self::map_io_error(e, &path, None))?)
    }

    #[instrument(skip(self), fields(backend = %self.name))]
    async fn fetch(&self, hash: &HashId) -> Result<Vec<u8>> {
        let path = self.object_path(hash);
        Ok(fs::read(&path).await.map_err(|e| Self::map_io_error(e, &path, Some(hash)))?)
    }

    #[instrument(skip(self, data), fields(backend = %self.name, bytes = data.len()))]
    async fn store(&self, hash: &HashId, data: &[u8]) -> Result<()> {
        let path = self.object_path(hash);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, parent, None))?;
        }
        // Write next to the target and rename over it, so concurrent readers
        // never observe a half-written blob.
        let staging = path.with_extension(format!("{}.tmp", std::process::id()));
        fs::write(&staging, data).await.map_err(|e| Self::map_io_error(e, &staging, None))?;
        Ok(fs::rename(&staging, &path).await.map_err(|e| Self::map_io_error(e, &path, None))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBackend::new("name", temp_dir.path()).is_ok());
        assert!(LocalBackend::new("name", "relative/path").is_err());
        assert!(LocalBackend::new("name", "./relative").is_err());
    }

    #[test]
    fn test_new_rejects_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"data").unwrap();
        let err = LocalBackend::new("name", &file).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("cas");
        LocalBackend::new("name", &root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_object_path_is_sharded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let hash = HashId::new("abcdef0123").unwrap();
        assert_eq!(backend.object_path(&hash), temp_dir.path().join("ab").join("abcdef0123"));
    }

    #[tokio::test]
    async fn test_store_and_fetch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let data = b"PK\x03\x04 classes.jar";
        let hash = HashId::of(data);
        backend.store(&hash, data).await.unwrap();
        assert_eq!(backend.fetch(&hash).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_store_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let hash = HashId::of(b"data");
        backend.store(&hash, b"data").await.unwrap();
        backend.store(&hash, b"data").await.unwrap();
        assert_eq!(backend.fetch(&hash).await.unwrap(), b"data");
        // No staging files are left behind.
        let shard: Vec<_> = std::fs::read_dir(temp_dir.path().join(hash.shard())).unwrap().collect();
        assert_eq!(shard.len(), 1);
    }

    #[tokio::test]
    async fn test_exists() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let hash = HashId::of(b"data");
        assert!(!backend.exists(&hash).await.unwrap());
        backend.store(&hash, b"data").await.unwrap();
        assert!(backend.exists(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("name", temp_dir.path()).unwrap();
        let hash = HashId::of(b"never stored");
        let err = backend.fetch(&hash).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(missing) if *missing == hash));
    }
}
