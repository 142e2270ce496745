use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use outsync_storage::HashId;
use std::path::{Path, PathBuf};

/// A build output already present on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    relative_path: String,
    path: PathBuf,
    hash_id: Option<HashId>,
    sync_time_millis: Option<i64>,
}

impl LocalArtifact {
    pub fn new(relative_path: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            path: path.into(),
            hash_id: None,
            sync_time_millis: None,
        }
    }

    /// An artifact at `relative_path` underneath the output tree `root`.
    pub fn under(root: impl AsRef<Path>, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let path = root.as_ref().join(&relative_path);
        Self::new(relative_path, path)
    }

    pub fn with_hash_id(mut self, hash_id: HashId) -> Self {
        self.hash_id = Some(hash_id);
        self
    }

    pub fn with_sync_time(mut self, sync_time_millis: i64) -> Self {
        self.sync_time_millis = Some(sync_time_millis);
        self
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hash_id(&self) -> Option<&HashId> {
        self.hash_id.as_ref()
    }

    pub fn sync_time_millis(&self) -> Option<i64> {
        self.sync_time_millis
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path).await.or_raise(|| ErrorKind::Io(self.path.clone()))
    }

    /// Read the file and record its BLAKE3 content hash.
    pub async fn with_content_hash(self) -> Result<Self> {
        let contents = self.read().await?;
        Ok(self.with_hash_id(HashId::of(contents)))
    }
}
