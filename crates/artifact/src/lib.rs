//! Build output artifacts.
//!
//! An artifact is a single build output (a jar, an AAR, a resource bundle)
//! identified by its path relative to the build output tree. Some artifacts
//! are on local disk; others only exist in a remote build cache and are
//! fetched on demand. [`ArtifactRecord`] hides the difference from everything
//! that only needs paths and identities.
//!
//! Remote artifacts are persisted between syncs as an [`OutputArtifactRecord`]
//! and turned back into live objects by whichever [`ArtifactParser`] in the
//! [`ParserRegistry`] recognises them first.

mod artifact;
mod cached;
pub mod error;
mod local;
mod parser;
mod record;
mod remote;

pub use crate::artifact::ArtifactRecord;
pub use crate::cached::{CachedArtifact, CachedArtifactParser};
pub use crate::local::LocalArtifact;
pub use crate::parser::{ArtifactParser, ParserRegistry};
pub use crate::record::{ArtifactState, OutputArtifactRecord};
pub use crate::remote::{RemoteArtifact, artifact_state, key, to_record};
pub use outsync_prefetch::Blob;
pub use outsync_storage::HashId;
