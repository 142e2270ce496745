//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{HashId, StorageBackend};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Blobs are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. On top of plain
/// storage it records how often each blob was fetched, can simulate an
/// unreachable remote, and can delay fetches to widen race windows.
///
/// # Examples
///
/// ```
/// use outsync_storage::HashId;
/// use outsync_storage::backend::{MockBackend, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_blobs([b"classes.jar contents".to_vec()]);
/// let hash = HashId::of(b"classes.jar contents");
/// assert!(backend.exists(&hash).await?);
/// assert_eq!(backend.fetch(&hash).await?, b"classes.jar contents");
/// assert_eq!(backend.fetch_count(&hash), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<HashId, Vec<u8>>>,
    fetches: Mutex<HashMap<HashId, usize>>,
    total_fetches: AtomicUsize,
    offline: AtomicBool,
    latency: Option<Duration>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with blobs, each stored under its
    /// BLAKE3 [`HashId`].
    pub fn with_blobs(blobs: impl IntoIterator<Item = impl Into<Vec<u8>>>) -> Self {
        Self::from_map(
            blobs
                .into_iter()
                .map(|data| {
                    let data = data.into();
                    (HashId::of(&data), data)
                })
                .collect(),
        )
    }

    /// Create a mock backend pre-populated with blobs under explicit ids.
    ///
    /// Panics if any id fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_entries(entries: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (id, data) in entries {
            let id = id.into();
            let Ok(hash) = HashId::new(id.clone()) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_entries: invalid hash id {id:?}");
            };
            map.insert(hash, data.into());
        }
        Self::from_map(map)
    }

    fn from_map(storage: HashMap<HashId, Vec<u8>>) -> Self {
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(storage),
            fetches: Mutex::new(HashMap::new()),
            total_fetches: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            latency: None,
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Delay every fetch by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every operation fail with a retryable network error until switched
    /// back on. Fetch attempts made while offline are still counted.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of fetch calls made for `hash`, successful or not.
    pub fn fetch_count(&self, hash: &HashId) -> usize {
        let fetches = self.fetches.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        fetches.get(hash).copied().unwrap_or(0)
    }

    /// Number of fetch calls made across all hashes.
    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<()> {
        match self.offline.load(Ordering::SeqCst) {
            true => exn::bail!(ErrorKind::Network(format!("{} is offline", self.name))),
            false => Ok(()),
        }
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::from_map(HashMap::new())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, hash: &HashId) -> Result<bool> {
        self.check_online()?;
        Ok(self.storage.read().await.contains_key(hash))
    }

    async fn fetch(&self, hash: &HashId) -> Result<Vec<u8>> {
        {
            let mut fetches = self.fetches.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            *fetches.entry(hash.clone()).or_default() += 1;
        }
        self.total_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.check_online()?;
        let data = self.storage.read().await.get(hash).cloned();
        data.ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(hash.clone())))
    }

    async fn store(&self, hash: &HashId, data: &[u8]) -> Result<()> {
        self.check_online()?;
        self.storage.write().await.insert(hash.clone(), data.to_vec());
        Ok(())
    }
}
