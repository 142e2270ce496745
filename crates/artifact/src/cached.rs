//! Remote artifacts backed by the shared prefetch cache.

use crate::Blob;
use crate::error::{ErrorKind, Result};
use crate::parser::ArtifactParser;
use crate::record::OutputArtifactRecord;
use crate::remote::RemoteArtifact;
use async_trait::async_trait;
use exn::ResultExt;
use outsync_prefetch::Prefetcher;
use outsync_storage::HashId;
use std::sync::Arc;

/// A remote artifact whose bytes are fetched through a [`Prefetcher`].
///
/// Many artifacts may reference the same content hash. They all share the
/// prefetcher, so the bytes are transferred at most once per cache lifetime
/// however many of them ask.
#[derive(Clone)]
pub struct CachedArtifact {
    relative_path: String,
    hash_id: HashId,
    sync_time_millis: i64,
    prefetcher: Prefetcher,
}

impl CachedArtifact {
    pub fn new(
        relative_path: impl Into<String>,
        hash_id: HashId,
        sync_time_millis: i64,
        prefetcher: Prefetcher,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            hash_id,
            sync_time_millis,
            prefetcher,
        }
    }
}

#[async_trait]
impl RemoteArtifact for CachedArtifact {
    fn relative_path(&self) -> &str {
        &self.relative_path
    }

    fn hash_id(&self) -> &HashId {
        &self.hash_id
    }

    fn sync_time_millis(&self) -> i64 {
        self.sync_time_millis
    }

    fn prefetch(&self) {
        self.prefetcher.prefetch(&self.hash_id);
    }

    async fn fetch(&self) -> Result<Blob> {
        self.prefetcher
            .fetch(&self.hash_id)
            .await
            .or_raise(|| ErrorKind::Fetch(self.relative_path.clone()))
    }
}

impl std::fmt::Debug for CachedArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedArtifact")
            .field("relative_path", &self.relative_path)
            .field("hash_id", &self.hash_id)
            .field("sync_time_millis", &self.sync_time_millis)
            .field("backend", &self.prefetcher.backend().name())
            .finish()
    }
}

/// Recognises records that carry a valid content hash, optionally only
/// underneath a given path prefix.
#[derive(Debug, Clone)]
pub struct CachedArtifactParser {
    prefetcher: Prefetcher,
    path_prefix: Option<String>,
}

impl CachedArtifactParser {
    pub fn new(prefetcher: Prefetcher) -> Self {
        Self { prefetcher, path_prefix: None }
    }

    /// Only claim records whose relative path starts with `prefix`.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }
}

impl ArtifactParser for CachedArtifactParser {
    fn parse(&self, record: &OutputArtifactRecord) -> Option<Arc<dyn RemoteArtifact>> {
        if record.relative_path.is_empty() {
            return None;
        }
        if let Some(prefix) = &self.path_prefix
            && !record.relative_path.starts_with(prefix.as_str())
        {
            return None;
        }
        let hash = HashId::new(&record.hash_id).ok()?;
        Some(Arc::new(CachedArtifact::new(
            &record.relative_path,
            hash,
            record.sync_start_time_millis,
            self.prefetcher.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParserRegistry;
    use outsync_prefetch::PrefetchCache;
    use outsync_storage::backend::MockBackend;
    use rstest::rstest;
    use std::time::Duration;

    fn setup(blobs: &[&[u8]]) -> (Arc<MockBackend>, Prefetcher) {
        let backend = Arc::new(MockBackend::with_blobs(blobs.iter().map(|b| b.to_vec())));
        let prefetcher = Prefetcher::new(backend.clone(), Arc::new(PrefetchCache::new(1 << 16)), 4);
        (backend, prefetcher)
    }

    #[rstest]
    #[case("", "abc", None)]
    #[case("foo/lib.jar", "", None)]
    #[case("foo/lib.jar", "not/a/hash", None)]
    #[case("bar/lib.jar", "abc", None)]
    #[case("foo/lib.jar", "abc", Some("foo/lib.jar"))]
    fn test_parser_acceptance(#[case] path: &str, #[case] hash: &str, #[case] expected: Option<&str>) {
        let (_, prefetcher) = setup(&[]);
        let parser = CachedArtifactParser::new(prefetcher).with_path_prefix("foo/");
        let parsed = parser.parse(&OutputArtifactRecord::new(path, hash, 1));
        assert_eq!(parsed.as_ref().map(|a| a.relative_path()), expected);
    }

    #[tokio::test]
    async fn test_fetch_through_cache() {
        let (backend, prefetcher) = setup(&[b"classes"]);
        let hash = HashId::of(b"classes");
        let artifact = CachedArtifact::new("a/classes.jar", hash.clone(), 10, prefetcher.clone());

        assert_eq!(&*artifact.fetch().await.unwrap(), b"classes");
        assert_eq!(&*artifact.fetch().await.unwrap(), b"classes");
        assert_eq!(backend.fetch_count(&hash), 1);
        assert!(prefetcher.cache().contains(&hash));
    }

    #[tokio::test]
    async fn test_fetch_missing_blob() {
        let (_, prefetcher) = setup(&[]);
        let artifact = CachedArtifact::new("a/gone.jar", HashId::of(b"gone"), 10, prefetcher);
        let err = artifact.fetch().await.unwrap_err();
        assert_eq!(*err, ErrorKind::Fetch("a/gone.jar".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_artifacts_sharing_a_hash_transfer_once() {
        let backend = Arc::new(MockBackend::with_blobs([b"shared".to_vec()]).with_latency(Duration::from_millis(20)));
        let prefetcher = Prefetcher::new(backend.clone(), Arc::new(PrefetchCache::new(1 << 16)), 4);
        let registry = ParserRegistry::new().with(CachedArtifactParser::new(prefetcher));
        let hash = HashId::of(b"shared");

        let artifacts: Vec<_> = (0..8)
            .map(|i| {
                registry
                    .parse(&OutputArtifactRecord::new(format!("out/{i}/lib.jar"), hash.as_str(), 1))
                    .unwrap()
            })
            .collect();
        for artifact in &artifacts {
            artifact.prefetch();
        }
        for artifact in &artifacts {
            assert_eq!(&*artifact.fetch().await.unwrap(), b"shared");
        }
        assert_eq!(backend.fetch_count(&hash), 1);
    }
}
