//! Content-addressed transport for build outputs.
//!
//! Everything in here is keyed by a [`HashId`]: an identifier that uniquely
//! determines the bytes behind it. Backends only ever move whole blobs around;
//! caching and request deduplication live in `outsync-prefetch`.

pub mod backend;
pub mod error;
mod hash;

pub use crate::backend::StorageBackend;
pub use crate::hash::HashId;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
