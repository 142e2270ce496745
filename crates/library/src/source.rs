//! Where libraries come from: the per-pipeline sections of a sync.

use crate::model::{AarLibrary, GenericLibrary, JarLibrary, Library, ResourceLibrary};

/// Output of the Java import pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaSyncData {
    pub libraries: Vec<JarLibrary>,
}

/// Output of the Android import pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AndroidSyncData {
    /// `None` when resource processing was skipped entirely.
    pub resource_libraries: Option<Vec<ResourceLibrary>>,
    /// Jars discovered from compiler dependency metadata.
    pub javac_jar_libraries: Vec<JarLibrary>,
    pub aar_libraries: Vec<AarLibrary>,
}

/// Per-pipeline results of a sync. A section is `None` when its pipeline did
/// not run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub java: Option<JavaSyncData>,
    pub android: Option<AndroidSyncData>,
}

impl SyncState {
    pub fn java_source(&self) -> JavaLibrarySource<'_> {
        JavaLibrarySource { data: self.java.as_ref() }
    }

    pub fn android_source(&self) -> AndroidLibrarySource<'_> {
        AndroidLibrarySource { data: self.android.as_ref() }
    }
}

/// A producer of libraries for the aggregator.
pub trait LibrarySource {
    /// Used in logs and in [`Merge::absent`](crate::Merge::absent).
    fn name(&self) -> &str;

    /// The libraries this source contributes, in its own fixed order.
    ///
    /// `None` means the source had no data at all for this sync, as opposed
    /// to `Some` of an empty list.
    fn libraries(&self) -> Option<Vec<Library>>;
}

#[derive(Debug, Clone, Copy)]
pub struct JavaLibrarySource<'a> {
    data: Option<&'a JavaSyncData>,
}

impl LibrarySource for JavaLibrarySource<'_> {
    fn name(&self) -> &str {
        "java"
    }

    fn libraries(&self) -> Option<Vec<Library>> {
        let data = self.data?;
        Some(data.libraries.iter().cloned().map(Library::Jar).collect())
    }
}

/// Resource libraries first, then javac jars, then AARs.
#[derive(Debug, Clone, Copy)]
pub struct AndroidLibrarySource<'a> {
    data: Option<&'a AndroidSyncData>,
}

impl LibrarySource for AndroidLibrarySource<'_> {
    fn name(&self) -> &str {
        "android"
    }

    fn libraries(&self) -> Option<Vec<Library>> {
        let data = self.data?;
        let resources = data.resource_libraries.iter().flatten().cloned().map(Library::Resource);
        let jars = data.javac_jar_libraries.iter().cloned().map(Library::Jar);
        let aars = data.aar_libraries.iter().cloned().map(Library::Aar);
        Some(resources.chain(jars).chain(aars).collect())
    }
}

/// A named, already assembled collection of libraries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryCollection {
    name: String,
    libraries: Option<Vec<Library>>,
}

impl LibraryCollection {
    pub fn present(name: impl Into<String>, libraries: Vec<Library>) -> Self {
        Self { name: name.into(), libraries: Some(libraries) }
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self { name: name.into(), libraries: None }
    }

    pub fn generic(name: impl Into<String>, libraries: Vec<GenericLibrary>) -> Self {
        Self::present(name, libraries.into_iter().map(Library::Generic).collect())
    }
}

impl LibrarySource for LibraryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn libraries(&self) -> Option<Vec<Library>> {
        self.libraries.clone()
    }
}
