use crate::identity::{ArtifactIdentity, Normalizer};
use crate::model::{Library, LibraryKey};
use crate::source::{LibrarySource, SyncState};
use std::collections::HashSet;

/// Outcome of a single merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merge {
    /// Surviving libraries, in source order.
    pub libraries: Vec<Library>,
    /// Jar libraries dropped because an AAR provides the same jar.
    pub superseded: Vec<LibraryKey>,
    /// Sources that had no data for this sync.
    pub absent: Vec<String>,
    /// Whether any AAR was present, so that the jar filter ran at all.
    pub filter_applied: bool,
}

impl Merge {
    pub fn keys(&self) -> Vec<LibraryKey> {
        self.libraries.iter().map(Library::key).collect()
    }
}

/// Merges the libraries of several sources into one list for the project
/// model.
///
/// Two passes over the concatenated sources: the first collects the
/// normalized identity of every AAR's jar, the second drops every jar
/// library with one of those identities. Everything else passes through
/// untouched, in source order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryAggregator {
    normalizer: Normalizer,
}

impl LibraryAggregator {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn merge(&self, sources: &[&dyn LibrarySource]) -> Merge {
        let mut merge = Merge::default();
        let mut candidates = Vec::new();
        for source in sources {
            match source.libraries() {
                Some(libraries) => {
                    tracing::trace!(source = source.name(), count = libraries.len(), "Collected libraries");
                    candidates.extend(libraries);
                },
                None => {
                    tracing::debug!(source = source.name(), "Source has no sync data");
                    merge.absent.push(source.name().to_string());
                },
            }
        }

        let superseding = self.superseding_identities(&candidates);
        merge.filter_applied = superseding.is_some();

        for library in candidates {
            if let (Some(superseding), Library::Jar(jar)) = (&superseding, &library) {
                let identity = self.normalizer.normalize(jar.artifact.jar_for_library().relative_path());
                if superseding.contains(&identity) {
                    tracing::debug!(library = %library.key(), identity = %identity, "Dropping jar superseded by an AAR");
                    merge.superseded.push(library.key());
                    continue;
                }
            }
            merge.libraries.push(library);
        }

        tracing::debug!(
            libraries = merge.libraries.len(),
            superseded = merge.superseded.len(),
            absent = merge.absent.len(),
            "Merged libraries"
        );
        merge
    }

    /// Merge the Java and Android sections of a sync, in that order.
    pub fn merge_sync_state(&self, state: &SyncState) -> Merge {
        let java = state.java_source();
        let android = state.android_source();
        let sources: [&dyn LibrarySource; 2] = [&java, &android];
        self.merge(&sources)
    }

    /// `None` when there are no AARs, in which case no jar is ever dropped.
    fn superseding_identities(&self, libraries: &[Library]) -> Option<HashSet<ArtifactIdentity>> {
        let identities: HashSet<_> = libraries
            .iter()
            .filter_map(|library| match library {
                Library::Aar(aar) => Some(self.normalizer.normalize(aar.artifact.jar_for_library().relative_path())),
                _ => None,
            })
            .collect();
        (!identities.is_empty()).then_some(identities)
    }
}

/// Merge `sources` and return only the surviving libraries.
pub fn merge_libraries(sources: &[&dyn LibrarySource], normalizer: &Normalizer) -> Vec<Library> {
    LibraryAggregator::new(*normalizer).merge(sources).libraries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LibraryArtifact;
    use crate::source::LibraryCollection;
    use outsync_artifact::{ArtifactRecord, LocalArtifact};

    fn local(path: &str) -> ArtifactRecord {
        LocalArtifact::under("/out", path).into()
    }

    fn jar(path: &str) -> Library {
        Library::jar(LibraryArtifact::from_class_jar(local(path)))
    }

    fn aar(aar_path: &str, jar_path: &str) -> Library {
        Library::aar(local(aar_path), LibraryArtifact::from_class_jar(local(jar_path)))
    }

    #[test]
    fn test_no_aars_no_filter() {
        let java = LibraryCollection::present("java", vec![jar("a/x86_64/lib.jar"), jar("b/lib.jar")]);
        let merge = LibraryAggregator::default().merge(&[&java]);
        assert!(!merge.filter_applied);
        assert_eq!(merge.libraries.len(), 2);
        assert!(merge.superseded.is_empty());
    }

    #[test]
    fn test_interface_jar_identity() {
        let java = LibraryCollection::present(
            "java",
            vec![Library::jar(LibraryArtifact::from_interface_jar(local("a/k8/lib-ijar.jar")))],
        );
        let android = LibraryCollection::present(
            "android",
            vec![Library::aar(local("a/lib.aar"), LibraryArtifact::from_interface_jar(local("a/arm64/lib-ijar.jar")))],
        );
        let merge = LibraryAggregator::default().merge(&[&java, &android]);
        assert_eq!(merge.superseded.len(), 1);
        assert_eq!(merge.keys(), [LibraryKey::from_artifact(&local("a/lib.aar"))]);
    }

    #[test]
    fn test_other_variants_pass_through() {
        let android = LibraryCollection::present(
            "android",
            vec![Library::resource(local("foo/x86_64/lib.jar")), aar("foo/lib.aar", "foo/armv7a/lib.jar")],
        );
        let generic = LibraryCollection::generic(
            "generic",
            vec![crate::model::GenericLibrary { primary: local("foo/k8/lib.jar"), others: vec![] }],
        );
        let merge = LibraryAggregator::default().merge(&[&android, &generic]);
        assert!(merge.superseded.is_empty());
        assert_eq!(merge.libraries.len(), 3);
    }

    #[test]
    fn test_same_path_different_variants_both_survive() {
        let java = LibraryCollection::present("java", vec![jar("a/res.jar")]);
        let android = LibraryCollection::present("android", vec![Library::resource(local("a/res.jar"))]);
        let merge = LibraryAggregator::default().merge(&[&java, &android]);
        let kinds: Vec<_> = merge.libraries.iter().map(Library::kind).collect();
        assert_eq!(kinds, ["jar", "resource"]);
        assert!(merge.superseded.is_empty());
    }

    #[test]
    fn test_repeated_jar_without_aar_is_kept() {
        let first = LibraryCollection::present("first", vec![jar("a/lib.jar")]);
        let second = LibraryCollection::present("second", vec![jar("a/lib.jar")]);
        let merge = LibraryAggregator::default().merge(&[&first, &second]);
        assert_eq!(merge.libraries, [jar("a/lib.jar"), jar("a/lib.jar")]);
    }

    #[test]
    fn test_custom_configuration_segment() {
        let normalizer = Normalizer::new(2);
        let java = LibraryCollection::present("java", vec![jar("bazel-out/bin/x86_64/lib.jar")]);
        let android = LibraryCollection::present("android", vec![aar("lib.aar", "bazel-out/bin/arm64/lib.jar")]);
        let libraries = merge_libraries(&[&java, &android], &normalizer);
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0].kind(), "aar");
    }
}
