use crate::Blob;
use crate::error::Result;
use crate::local::LocalArtifact;
use crate::remote::RemoteArtifact;
use outsync_storage::HashId;
use std::sync::Arc;

/// Either a local file or a remote artifact.
///
/// Library aggregation only ever looks at paths, so it works on this type
/// without caring where the bytes live.
#[derive(Debug, Clone)]
pub enum ArtifactRecord {
    Local(LocalArtifact),
    Remote(Arc<dyn RemoteArtifact>),
}

impl ArtifactRecord {
    pub fn relative_path(&self) -> &str {
        match self {
            Self::Local(local) => local.relative_path(),
            Self::Remote(remote) => remote.relative_path(),
        }
    }

    /// Stable identity across syncs.
    pub fn key(&self) -> &str {
        self.relative_path()
    }

    pub fn hash_id(&self) -> Option<&HashId> {
        match self {
            Self::Local(local) => local.hash_id(),
            Self::Remote(remote) => Some(remote.hash_id()),
        }
    }

    pub fn sync_time_millis(&self) -> Option<i64> {
        match self {
            Self::Local(local) => local.sync_time_millis(),
            Self::Remote(remote) => Some(remote.sync_time_millis()),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn as_remote(&self) -> Option<&Arc<dyn RemoteArtifact>> {
        match self {
            Self::Remote(remote) => Some(remote),
            Self::Local(_) => None,
        }
    }

    /// Start loading a remote artifact in the background. Local artifacts
    /// are already available.
    pub fn prefetch(&self) {
        if let Self::Remote(remote) = self {
            remote.prefetch();
        }
    }

    pub async fn read(&self) -> Result<Blob> {
        match self {
            Self::Local(local) => Ok(Blob::from(local.read().await?)),
            Self::Remote(remote) => remote.fetch().await,
        }
    }
}

impl PartialEq for ArtifactRecord {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Local(a), Self::Local(b)) => a == b,
            (Self::Remote(a), Self::Remote(b)) => {
                a.relative_path() == b.relative_path()
                    && a.hash_id() == b.hash_id()
                    && a.sync_time_millis() == b.sync_time_millis()
            },
            _ => false,
        }
    }
}
impl Eq for ArtifactRecord {}

impl From<LocalArtifact> for ArtifactRecord {
    fn from(local: LocalArtifact) -> Self {
        Self::Local(local)
    }
}

impl From<Arc<dyn RemoteArtifact>> for ArtifactRecord {
    fn from(remote: Arc<dyn RemoteArtifact>) -> Self {
        Self::Remote(remote)
    }
}
