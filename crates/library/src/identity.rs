use derive_more::Display;

/// Position of the configuration segment in a build output path, e.g.
/// `bazel-out/<k8-fastbuild>/bin/...` or `foo/<x86_64>/lib.jar`.
pub const DEFAULT_CONFIGURATION_SEGMENT: usize = 1;

/// Configuration-independent identity of a build output path.
///
/// Two artifacts with the same identity are the same logical output, possibly
/// built for different target configurations.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactIdentity(String);

impl ArtifactIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Derives [`ArtifactIdentity`] values from relative paths.
///
/// ```
/// use outsync_library::Normalizer;
///
/// let normalizer = Normalizer::default();
/// assert_eq!(
///     normalizer.normalize("foo/x86_64/lib.jar"),
///     normalizer.normalize("foo/armv7a/lib.jar"),
/// );
/// assert_eq!(normalizer.normalize("foo/x86_64/lib.jar").as_str(), "foo/lib.jar");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    configuration_segment: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIGURATION_SEGMENT)
    }
}

impl Normalizer {
    pub const fn new(configuration_segment: usize) -> Self {
        Self { configuration_segment }
    }

    pub fn configuration_segment(&self) -> usize {
        self.configuration_segment
    }

    /// Clean `relative_path` and drop its configuration segment.
    ///
    /// Cleaning removes empty and `.` segments and resolves `..` (never above
    /// the root). The configuration segment is only removed when the path has
    /// at least one segment after it; the file name is never dropped.
    pub fn normalize(&self, relative_path: &str) -> ArtifactIdentity {
        let mut segments: Vec<&str> = Vec::new();
        for segment in relative_path.split(['/', '\\']) {
            match segment {
                "" | "." => {},
                ".." => {
                    segments.pop();
                },
                segment => segments.push(segment),
            }
        }
        if segments.len() > self.configuration_segment + 1 {
            segments.remove(self.configuration_segment);
        }
        ArtifactIdentity(segments.join("/"))
    }
}
