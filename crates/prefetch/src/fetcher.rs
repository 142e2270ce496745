//! Single-flight remote fetches in front of the [`PrefetchCache`].

use crate::cache::{Blob, PrefetchCache};
use crate::error::{ErrorKind, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use outsync_storage::error::ErrorKind as StorageErrorKind;
use outsync_storage::{BackendHandle, HashId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::Semaphore;
use tracing::instrument;

/// Outcome of one remote fetch, shared by every waiter. Errors are flattened
/// to their kind because the waiters each raise their own error tree.
type FetchOutcome = std::result::Result<Blob, ErrorKind>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;
type InFlight = Mutex<HashMap<HashId, SharedFetch>>;

enum Lookup {
    Cached(Blob),
    InFlight(SharedFetch),
}

struct Inner {
    backend: BackendHandle,
    cache: Arc<PrefetchCache>,
    in_flight: Arc<InFlight>,
    permits: Arc<Semaphore>,
    remote_fetches: Arc<AtomicU64>,
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<HashId, SharedFetch>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Fetches blobs from a remote [`StorageBackend`](outsync_storage::StorageBackend)
/// through a [`PrefetchCache`].
///
/// There is at most one remote fetch in flight per [`HashId`] at any time:
/// concurrent [`prefetch`](Self::prefetch) and [`fetch`](Self::fetch) calls for
/// the same hash all wait on the same transfer. Failed transfers are never
/// cached; the next access starts a fresh one.
///
/// Cloning is cheap and every clone shares the same cache and in-flight set.
///
/// # Examples
///
/// ```no_run
/// use outsync_prefetch::{PrefetchCache, Prefetcher};
/// use outsync_storage::{BackendHandle, HashId};
/// use std::sync::Arc;
///
/// # async fn example(backend: BackendHandle) -> outsync_prefetch::error::Result<()> {
/// let prefetcher = Prefetcher::new(backend, Arc::new(PrefetchCache::new(64 << 20)), 16);
/// let hash = HashId::new("9f86d081884c7d659a2feaa0c55ad015").unwrap();
/// // Warm the cache in the background...
/// prefetcher.prefetch(&hash);
/// // ...and later read the bytes, joining the transfer if it is still running.
/// let bytes = prefetcher.fetch(&hash).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Prefetcher {
    inner: Arc<Inner>,
}

impl Prefetcher {
    /// Create a prefetcher allowing at most `max_concurrent_fetches` remote
    /// transfers at once (across all hashes). A limit of zero is treated as one.
    pub fn new(backend: BackendHandle, cache: Arc<PrefetchCache>, max_concurrent_fetches: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                cache,
                in_flight: Arc::new(Mutex::new(HashMap::new())),
                permits: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
                remote_fetches: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    pub fn cache(&self) -> &PrefetchCache {
        &self.inner.cache
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.inner.backend
    }

    /// Number of transport calls made so far.
    pub fn remote_fetches(&self) -> u64 {
        self.inner.remote_fetches.load(Ordering::SeqCst)
    }

    /// Number of hashes currently being fetched.
    pub fn in_flight(&self) -> usize {
        lock(&self.inner.in_flight).len()
    }

    /// Request that `hash` be loaded into the cache ahead of need.
    ///
    /// Returns immediately. Best effort: failures are logged and otherwise
    /// ignored, and a later [`fetch`](Self::fetch) will simply try again.
    /// Calling this repeatedly (or concurrently) for the same hash never
    /// starts more than one transfer. Outside of a Tokio runtime this does
    /// nothing.
    pub fn prefetch(&self, hash: &HashId) {
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::debug!(hash = %hash, "No async runtime available; skipping prefetch");
            return;
        }
        // A new transfer is spawned by `lookup` itself.
        if let Lookup::InFlight(_) = self.lookup(hash) {
            tracing::trace!(hash = %hash, "Prefetch in flight");
        }
    }

    /// Read the bytes behind `hash`, from the cache if possible and from the
    /// remote otherwise.
    ///
    /// # Errors
    /// [`ErrorKind::NotFound`] if the remote does not have the blob and
    /// [`ErrorKind::Fetch`] for any other transport failure.
    #[instrument(skip(self), fields(backend = self.inner.backend.name()))]
    pub async fn fetch(&self, hash: &HashId) -> Result<Blob> {
        match self.lookup(hash) {
            Lookup::Cached(blob) => Ok(blob),
            Lookup::InFlight(fetch) => Ok(fetch.await?),
        }
    }

    /// Find the bytes in the cache, or join (or start) the transfer for them.
    fn lookup(&self, hash: &HashId) -> Lookup {
        if let Some(blob) = self.inner.cache.get(hash) {
            return Lookup::Cached(blob);
        }
        let mut in_flight = lock(&self.inner.in_flight);
        if let Some(fetch) = in_flight.get(hash) {
            return Lookup::InFlight(fetch.clone());
        }
        // A transfer may have completed between the cache miss above and
        // taking the lock. Completed transfers populate the cache before
        // leaving the in-flight set, so checking again under the lock is
        // enough to never start a redundant one.
        if let Some(blob) = self.inner.cache.get(hash) {
            return Lookup::Cached(blob);
        }
        let fetch = self.remote_fetch(hash.clone());
        in_flight.insert(hash.clone(), fetch.clone());
        drop(in_flight);
        drive(hash, fetch.clone());
        Lookup::InFlight(fetch)
    }

    fn remote_fetch(&self, hash: HashId) -> SharedFetch {
        let backend = self.inner.backend.clone();
        let cache = self.inner.cache.clone();
        let permits = self.inner.permits.clone();
        let counter = self.inner.remote_fetches.clone();
        // Weak, otherwise the in-flight map would own a future that owns the map.
        let in_flight: Weak<InFlight> = Arc::downgrade(&self.inner.in_flight);
        async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!(hash = %hash, backend = backend.name(), "Fetching blob from remote");
                    backend.fetch(&hash).await
                },
                Err(_) => Err(exn::Exn::from(StorageErrorKind::BackendError("fetch limiter closed".to_string()))),
            };
            let outcome = match result {
                Ok(bytes) => {
                    let blob: Blob = bytes.into();
                    cache.put(hash.clone(), blob.clone());
                    Ok(blob)
                },
                Err(err) => {
                    let reason = (*err).to_string();
                    tracing::warn!(hash = %hash, backend = backend.name(), error = %reason, "Remote fetch failed");
                    Err(match &*err {
                        StorageErrorKind::NotFound(_) => ErrorKind::NotFound(hash.clone()),
                        kind => ErrorKind::Fetch { hash: hash.clone(), reason, retryable: kind.is_retryable() },
                    })
                },
            };
            // Only leave the in-flight set once the cache has been populated.
            if let Some(in_flight) = in_flight.upgrade() {
                lock(&in_flight).remove(&hash);
            }
            outcome
        }
        .boxed()
        .shared()
    }
}

/// Poll `fetch` to completion on a task of its own, so the transfer finishes
/// (and releases its permit) even when every caller waiting on it is dropped.
/// Without a Tokio runtime the waiting callers drive it themselves.
fn drive(hash: &HashId, fetch: SharedFetch) {
    match tokio::runtime::Handle::try_current() {
        // The detached task only ever fills the cache.
        Ok(runtime) => drop(runtime.spawn(async move {
            _ = fetch.await;
        })),
        Err(_) => tracing::trace!(hash = %hash, "No async runtime available; fetch driven by its callers"),
    }
}

impl std::fmt::Debug for Prefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetcher")
            .field("backend", &self.inner.backend.name())
            .field("cache", &self.inner.cache)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
