use crate::Blob;
use crate::error::Result;
use crate::record::{ArtifactState, OutputArtifactRecord};
use async_trait::async_trait;
use outsync_storage::HashId;
use std::fmt::Debug;

/// A build output that lives in a remote cache rather than on local disk.
///
/// Implementors provide the identity triple and a way to get at the bytes.
/// Everything derived from that triple (the artifact key, its serialized
/// record, its sync state) comes from the free functions [`key`],
/// [`to_record`] and [`artifact_state`], so every implementation derives them
/// the same way.
#[async_trait]
pub trait RemoteArtifact: Debug + Send + Sync {
    /// Path relative to the build output tree.
    fn relative_path(&self) -> &str;

    /// Content hash in the remote cache.
    fn hash_id(&self) -> &HashId;

    /// When the sync that produced this artifact started.
    fn sync_time_millis(&self) -> i64;

    /// Hint that the bytes will be needed soon.
    ///
    /// Returns immediately. Implementations must tolerate being called any
    /// number of times, from any thread, without duplicating transfers.
    fn prefetch(&self);

    /// The full bytes of the artifact.
    async fn fetch(&self) -> Result<Blob>;
}

/// Stable identity of an artifact across syncs: its relative path.
pub fn key<A: RemoteArtifact + ?Sized>(artifact: &A) -> &str {
    artifact.relative_path()
}

/// Serialized form of an artifact, suitable for persisting between syncs.
pub fn to_record<A: RemoteArtifact + ?Sized>(artifact: &A) -> OutputArtifactRecord {
    OutputArtifactRecord::new(
        artifact.relative_path(),
        artifact.hash_id().as_str(),
        artifact.sync_time_millis(),
    )
}

/// What the incremental sync remembers about an artifact.
pub fn artifact_state<A: RemoteArtifact + ?Sized>(artifact: &A) -> ArtifactState {
    ArtifactState {
        key: key(artifact).to_string(),
        hash_id: artifact.hash_id().to_string(),
        sync_time_millis: artifact.sync_time_millis(),
    }
}
