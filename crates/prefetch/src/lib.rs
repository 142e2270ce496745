//! In-memory prefetch cache for remote build outputs.
//!
//! This crate provides the ephemeral cache that sits between consumers of
//! artifact bytes and the remote transport. The cache is not the source of
//! truth - the remote build cache is. Any entry may disappear at any time and
//! will simply be fetched again on the next access.
//!
//! # Architecture
//! - [`PrefetchCache`]: bytes keyed by [`HashId`](outsync_storage::HashId),
//!   bounded by a byte budget with least-recently-used eviction. Because keys
//!   are content hashes, two artifacts built at different paths but with the
//!   same content share one entry.
//! - [`Prefetcher`]: the only component that talks to the transport. It
//!   guarantees at most one in-flight remote fetch per hash, shared by every
//!   caller (background prefetches and on-demand reads alike).

mod cache;
pub mod error;
mod fetcher;

pub use crate::cache::{Blob, CacheStats, PrefetchCache};
pub use crate::fetcher::Prefetcher;
