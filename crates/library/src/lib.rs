//! Library aggregation.
//!
//! After a sync, every import pipeline contributes its own collection of
//! libraries. The same output can show up in more than one of them: the
//! Android pipeline reports an AAR together with the jar inside it, while the
//! Java pipeline may report that very jar as a plain jar library, possibly
//! built for a different target configuration. [`LibraryAggregator`] merges
//! the collections and drops those plain jars, comparing paths by their
//! configuration-independent [`ArtifactIdentity`].

mod identity;
mod merge;
mod model;
mod source;

pub use crate::identity::{ArtifactIdentity, DEFAULT_CONFIGURATION_SEGMENT, Normalizer};
pub use crate::merge::{LibraryAggregator, Merge, merge_libraries};
pub use crate::model::{
    AarLibrary, GenericLibrary, JarLibrary, Library, LibraryArtifact, LibraryKey, ResourceLibrary,
};
pub use crate::source::{
    AndroidLibrarySource, AndroidSyncData, JavaLibrarySource, JavaSyncData, LibraryCollection, LibrarySource,
    SyncState,
};
