//! Library merging and remote artifact access for build-system aware IDE
//! syncs.
//!
//! [`Outsync`] wires a [`Config`] into the pieces that do the work: a remote
//! [`StorageBackend`](outsync_storage::StorageBackend), the shared
//! [`Prefetcher`], the [`ParserRegistry`] that revives persisted remote
//! artifacts, and the [`LibraryAggregator`].

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use outsync_artifact::{ArtifactRecord, CachedArtifactParser, OutputArtifactRecord, ParserRegistry};
use outsync_config::{Config, RemoteConfig};
use outsync_library::{Library, LibraryAggregator, Merge, Normalizer, SyncState};
use outsync_prefetch::{PrefetchCache, Prefetcher};
use outsync_storage::BackendHandle;
use outsync_storage::backend::LocalBackend;
use std::path::Path;
use std::sync::Arc;

pub use outsync_artifact as artifact;
pub use outsync_config as config;
pub use outsync_library as library;
pub use outsync_prefetch as prefetch;
pub use outsync_storage as storage;

const REMOTE_BACKEND_NAME: &str = "remote";

#[derive(Debug)]
pub struct Outsync {
    config: Config,
    prefetcher: Option<Prefetcher>,
    registry: ParserRegistry,
    aggregator: LibraryAggregator,
}

impl Outsync {
    /// Load configuration from `path` (or the default location) and the
    /// environment, then build everything from it.
    pub async fn load(path: Option<&Path>, registry: ParserRegistry) -> Result<Self> {
        let config = Config::load(path).or_raise(|| ErrorKind::Config)?;
        Self::from_config(config, registry).await
    }

    /// Open the configured remote, if any, and build everything around it.
    pub async fn from_config(config: Config, registry: ParserRegistry) -> Result<Self> {
        let backend = match &config.remote {
            Some(remote) => Some(open_backend(remote).await?),
            None => None,
        };
        Ok(Self::with_backend(config, backend, registry))
    }

    /// Build around an already opened backend.
    ///
    /// Parsers already in `registry` are consulted before the built-in
    /// parser for cached remote artifacts, which is only registered when
    /// there is a backend to fetch from.
    pub fn with_backend(config: Config, backend: Option<BackendHandle>, mut registry: ParserRegistry) -> Self {
        let prefetcher = backend.map(|backend| {
            let cache = Arc::new(PrefetchCache::new(config.cache.capacity_bytes));
            Prefetcher::new(backend, cache, config.prefetch.max_concurrent_fetches)
        });
        if let Some(prefetcher) = &prefetcher {
            let mut parser = CachedArtifactParser::new(prefetcher.clone());
            if let Some(prefix) = &config.remote_path_prefix {
                parser = parser.with_path_prefix(prefix);
            }
            registry.register(parser);
        }
        tracing::debug!(
            remote = prefetcher.as_ref().map(|p| p.backend().name()),
            parsers = registry.len(),
            "Initialised"
        );
        let aggregator = LibraryAggregator::new(Normalizer::new(config.library.configuration_segment));
        Self { config, prefetcher, registry, aggregator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `None` when no remote is configured.
    pub fn prefetcher(&self) -> Option<&Prefetcher> {
        self.prefetcher.as_ref()
    }

    pub fn registry(&self) -> &ParserRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &LibraryAggregator {
        &self.aggregator
    }

    /// Revive a persisted artifact, as a remote one if any parser recognises
    /// it and as a file under `output_root` otherwise.
    pub fn resolve(&self, record: &OutputArtifactRecord, output_root: impl AsRef<Path>) -> ArtifactRecord {
        self.registry.resolve(record, output_root)
    }

    pub fn merge(&self, state: &SyncState) -> Merge {
        self.aggregator.merge_sync_state(state)
    }

    /// Start loading every remote artifact of `libraries` into the cache.
    /// Returns how many remote artifacts were asked to prefetch.
    pub fn prefetch_libraries(&self, libraries: &[Library]) -> usize {
        let remote: Vec<_> = libraries
            .iter()
            .flat_map(Library::artifacts)
            .filter(|artifact| artifact.is_remote())
            .collect();
        for artifact in &remote {
            artifact.prefetch();
        }
        tracing::debug!(count = remote.len(), "Prefetching library artifacts");
        remote.len()
    }
}

async fn open_backend(remote: &RemoteConfig) -> Result<BackendHandle> {
    match remote {
        RemoteConfig::Local { path } => {
            let backend = LocalBackend::new(REMOTE_BACKEND_NAME, path).or_raise(|| ErrorKind::Storage)?;
            Ok(Arc::new(backend))
        },
        #[cfg(feature = "s3")]
        RemoteConfig::S3 { bucket, prefix, region, endpoint, key_id, key_secret } => {
            let backend = outsync_storage::backend::S3Backend::new(
                REMOTE_BACKEND_NAME,
                bucket,
                prefix.clone(),
                region,
                endpoint.as_deref(),
                key_id,
                key_secret,
            )
            .await
            .or_raise(|| ErrorKind::Storage)?;
            Ok(Arc::new(backend))
        },
        #[cfg(not(feature = "s3"))]
        RemoteConfig::S3 { .. } => exn::bail!(ErrorKind::Unsupported("s3".to_string())),
    }
}
