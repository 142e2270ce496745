//! Bounded, content-addressed blob store.

use mini_moka::sync::{Cache, ConcurrentCacheExt};
use outsync_storage::HashId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cached artifact bytes. Cheap to clone; handed out to every reader of the
/// same hash.
pub type Blob = Arc<[u8]>;

/// Point-in-time counters, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

fn weigh(_hash: &HashId, blob: &Blob) -> u32 {
    blob.len().try_into().unwrap_or(u32::MAX)
}

/// Memory-bounded cache of fetched artifact bytes, keyed by content hash.
///
/// Entries are weighed by their length in bytes. Once the total weight goes
/// over the capacity the cache reclaims entries on its own, preferring the
/// least useful ones; callers can also force eviction with
/// [`evict`](Self::evict) or [`clear`](Self::clear). A miss is never an
/// error, only a reason to fetch again.
///
/// # Examples
///
/// ```
/// use outsync_prefetch::PrefetchCache;
/// use outsync_storage::HashId;
///
/// let cache = PrefetchCache::new(1024);
/// let hash = HashId::of(b"classes.jar");
/// cache.put(hash.clone(), b"classes.jar".as_slice());
/// assert_eq!(cache.get(&hash).as_deref(), Some(b"classes.jar".as_slice()));
///
/// cache.evict(&hash);
/// assert!(cache.get(&hash).is_none());
/// ```
pub struct PrefetchCache {
    capacity: usize,
    blobs: Cache<HashId, Blob>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PrefetchCache {
    /// Create an empty cache holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            blobs: Cache::builder().weigher(weigh).max_capacity(capacity as u64).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up cached bytes, recording the access.
    pub fn get(&self, hash: &HashId) -> Option<Blob> {
        let blob = self.blobs.get(hash);
        match &blob {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        blob
    }

    /// Whether `hash` is currently cached. Does not count as an access.
    pub fn contains(&self, hash: &HashId) -> bool {
        self.blobs.contains_key(hash)
    }

    /// Cache `blob` under `hash`.
    ///
    /// Returns `false` if the blob alone exceeds the cache capacity and was
    /// not stored. Storing the same hash again replaces the entry, which is
    /// harmless since the hash determines the content.
    pub fn put(&self, hash: HashId, blob: impl Into<Blob>) -> bool {
        let blob = blob.into();
        if blob.len() > self.capacity {
            tracing::debug!(hash = %hash, bytes = blob.len(), capacity = self.capacity, "Blob larger than prefetch cache; not caching");
            return false;
        }
        self.blobs.insert(hash, blob);
        true
    }

    /// Drop a single entry. Returns `true` if it was cached.
    pub fn evict(&self, hash: &HashId) -> bool {
        let cached = self.blobs.contains_key(hash);
        self.blobs.invalidate(hash);
        cached
    }

    /// Drop every entry, as if the runtime had reclaimed all memory.
    pub fn clear(&self) {
        self.blobs.invalidate_all();
        self.blobs.sync();
    }

    /// Entry count and weight are maintained lazily; flush pending
    /// bookkeeping before reading them.
    fn settle(&self) -> (usize, usize) {
        self.blobs.sync();
        (self.blobs.entry_count() as usize, self.blobs.weighted_size() as usize)
    }

    pub fn len(&self) -> usize {
        self.settle().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently held.
    pub fn size(&self) -> usize {
        self.settle().1
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, size) = self.settle();
        CacheStats {
            entries,
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for PrefetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchCache").field("capacity", &self.capacity).field("stats", &self.stats()).finish()
    }
}
