//! The libraries handed to the project model after a sync.
//!
//! Libraries are rebuilt from scratch on every sync and never mutated. Each
//! one is identified towards the project model by a [`LibraryKey`] derived
//! from its primary artifact.

use derive_more::Display;
use outsync_artifact::ArtifactRecord;

/// Stable identity of a library in the project model: the relative path of
/// its primary artifact.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LibraryKey(String);

impl LibraryKey {
    pub fn from_artifact(artifact: &ArtifactRecord) -> Self {
        Self(artifact.relative_path().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Jars {
    Class(ArtifactRecord),
    Interface(ArtifactRecord),
    Both { interface: ArtifactRecord, class: ArtifactRecord },
}

/// The jars behind a library: an interface jar, a class jar or both, plus
/// any number of source jars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryArtifact {
    jars: Jars,
    source_jars: Vec<ArtifactRecord>,
}

impl LibraryArtifact {
    pub fn from_class_jar(jar: impl Into<ArtifactRecord>) -> Self {
        Self { jars: Jars::Class(jar.into()), source_jars: Vec::new() }
    }

    pub fn from_interface_jar(jar: impl Into<ArtifactRecord>) -> Self {
        Self { jars: Jars::Interface(jar.into()), source_jars: Vec::new() }
    }

    pub fn with_class_jar(self, jar: impl Into<ArtifactRecord>) -> Self {
        let class = jar.into();
        let jars = match self.jars {
            Jars::Class(_) => Jars::Class(class),
            Jars::Interface(interface) | Jars::Both { interface, .. } => Jars::Both { interface, class },
        };
        Self { jars, source_jars: self.source_jars }
    }

    pub fn with_interface_jar(self, jar: impl Into<ArtifactRecord>) -> Self {
        let interface = jar.into();
        let jars = match self.jars {
            Jars::Interface(_) => Jars::Interface(interface),
            Jars::Class(class) | Jars::Both { class, .. } => Jars::Both { interface, class },
        };
        Self { jars, source_jars: self.source_jars }
    }

    pub fn with_source_jar(mut self, jar: impl Into<ArtifactRecord>) -> Self {
        self.source_jars.push(jar.into());
        self
    }

    pub fn class_jar(&self) -> Option<&ArtifactRecord> {
        match &self.jars {
            Jars::Class(class) | Jars::Both { class, .. } => Some(class),
            Jars::Interface(_) => None,
        }
    }

    pub fn interface_jar(&self) -> Option<&ArtifactRecord> {
        match &self.jars {
            Jars::Interface(interface) | Jars::Both { interface, .. } => Some(interface),
            Jars::Class(_) => None,
        }
    }

    pub fn source_jars(&self) -> &[ArtifactRecord] {
        &self.source_jars
    }

    /// The jar to attach to the project model: the class jar if there is one,
    /// otherwise the interface jar.
    pub fn jar_for_library(&self) -> &ArtifactRecord {
        match &self.jars {
            Jars::Class(jar) | Jars::Interface(jar) | Jars::Both { class: jar, .. } => jar,
        }
    }

    /// Every artifact, binary jars first.
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactRecord> {
        let binaries = match &self.jars {
            Jars::Class(jar) | Jars::Interface(jar) => [Some(jar), None],
            Jars::Both { interface, class } => [Some(interface), Some(class)],
        };
        binaries.into_iter().flatten().chain(self.source_jars.iter())
    }
}

/// A plain jar dependency, typically discovered from compiler dependency
/// metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarLibrary {
    pub artifact: LibraryArtifact,
}

/// An Android archive, along with the jar extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AarLibrary {
    pub aar: ArtifactRecord,
    pub artifact: LibraryArtifact,
    /// Java package of the generated resource class, if known.
    pub resource_package: Option<String>,
}

/// An Android resource bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLibrary {
    pub resources: ArtifactRecord,
}

/// Any other output grouping. The first artifact is the primary one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericLibrary {
    pub primary: ArtifactRecord,
    pub others: Vec<ArtifactRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Library {
    Jar(JarLibrary),
    Aar(AarLibrary),
    Resource(ResourceLibrary),
    Generic(GenericLibrary),
}

impl Library {
    pub fn jar(artifact: LibraryArtifact) -> Self {
        Self::Jar(JarLibrary { artifact })
    }

    pub fn aar(aar: impl Into<ArtifactRecord>, artifact: LibraryArtifact) -> Self {
        Self::Aar(AarLibrary { aar: aar.into(), artifact, resource_package: None })
    }

    pub fn resource(resources: impl Into<ArtifactRecord>) -> Self {
        Self::Resource(ResourceLibrary { resources: resources.into() })
    }

    pub fn generic(primary: impl Into<ArtifactRecord>, others: Vec<ArtifactRecord>) -> Self {
        Self::Generic(GenericLibrary { primary: primary.into(), others })
    }

    pub fn primary_artifact(&self) -> &ArtifactRecord {
        match self {
            Self::Jar(jar) => jar.artifact.jar_for_library(),
            Self::Aar(aar) => &aar.aar,
            Self::Resource(resource) => &resource.resources,
            Self::Generic(generic) => &generic.primary,
        }
    }

    pub fn key(&self) -> LibraryKey {
        LibraryKey::from_artifact(self.primary_artifact())
    }

    pub fn artifacts(&self) -> Vec<&ArtifactRecord> {
        match self {
            Self::Jar(jar) => jar.artifact.artifacts().collect(),
            Self::Aar(aar) => std::iter::once(&aar.aar).chain(aar.artifact.artifacts()).collect(),
            Self::Resource(resource) => vec![&resource.resources],
            Self::Generic(generic) => std::iter::once(&generic.primary).chain(generic.others.iter()).collect(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Jar(_) => "jar",
            Self::Aar(_) => "aar",
            Self::Resource(_) => "resource",
            Self::Generic(_) => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outsync_artifact::LocalArtifact;

    fn local(path: &str) -> ArtifactRecord {
        LocalArtifact::under("/out", path).into()
    }

    #[test]
    fn test_jar_for_library_prefers_class_jar() {
        let interface_only = LibraryArtifact::from_interface_jar(local("a/libfoo-ijar.jar"));
        assert_eq!(interface_only.jar_for_library().relative_path(), "a/libfoo-ijar.jar");
        assert!(interface_only.class_jar().is_none());

        let both = interface_only.with_class_jar(local("a/libfoo.jar"));
        assert_eq!(both.jar_for_library().relative_path(), "a/libfoo.jar");
        assert_eq!(both.interface_jar().map(ArtifactRecord::relative_path), Some("a/libfoo-ijar.jar"));

        let class_only = LibraryArtifact::from_class_jar(local("a/libbar.jar")).with_interface_jar(local("a/libbar-ijar.jar"));
        assert_eq!(class_only.jar_for_library().relative_path(), "a/libbar.jar");
    }

    #[test]
    fn test_keys_and_artifacts() {
        let jar = Library::jar(LibraryArtifact::from_class_jar(local("a/lib.jar")).with_source_jar(local("a/lib-src.jar")));
        assert_eq!(jar.key().as_str(), "a/lib.jar");
        assert_eq!(jar.artifacts().len(), 2);

        let aar = Library::aar(local("b/lib.aar"), LibraryArtifact::from_class_jar(local("b/classes.jar")));
        assert_eq!(aar.key().as_str(), "b/lib.aar");
        let paths: Vec<_> = aar.artifacts().into_iter().map(ArtifactRecord::relative_path).collect();
        assert_eq!(paths, ["b/lib.aar", "b/classes.jar"]);

        let resource = Library::resource(local("c/res.zip"));
        assert_eq!(resource.key().as_str(), "c/res.zip");
        assert_eq!(resource.kind(), "resource");

        let generic = Library::generic(local("d/out.bin"), vec![local("d/extra.bin")]);
        assert_eq!(generic.key().as_str(), "d/out.bin");
        assert_eq!(generic.artifacts().len(), 2);
    }
}
