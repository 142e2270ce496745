use crate::artifact::ArtifactRecord;
use crate::error::Result;
use crate::local::LocalArtifact;
use crate::record::OutputArtifactRecord;
use crate::remote::RemoteArtifact;
use outsync_storage::HashId;
use std::path::Path;
use std::sync::Arc;

/// Something that knows how to turn a serialized record back into a live
/// remote artifact.
///
/// Returning `None` means "not mine", never "broken": the registry moves on
/// to the next parser.
pub trait ArtifactParser: Send + Sync {
    fn parse(&self, record: &OutputArtifactRecord) -> Option<Arc<dyn RemoteArtifact>>;
}

impl<F> ArtifactParser for F
where
    F: Fn(&OutputArtifactRecord) -> Option<Arc<dyn RemoteArtifact>> + Send + Sync,
{
    fn parse(&self, record: &OutputArtifactRecord) -> Option<Arc<dyn RemoteArtifact>> {
        self(record)
    }
}

/// Ordered set of parsers. The first one to recognise a record wins.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Box<dyn ArtifactParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parser. Parsers are consulted in registration order.
    pub fn register(&mut self, parser: impl ArtifactParser + 'static) -> &mut Self {
        self.parsers.push(Box::new(parser));
        self
    }

    pub fn with(mut self, parser: impl ArtifactParser + 'static) -> Self {
        self.register(parser);
        self
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Result of the first parser that recognises `record`, or `None` when
    /// none do (including when no parsers are registered).
    pub fn parse(&self, record: &OutputArtifactRecord) -> Option<Arc<dyn RemoteArtifact>> {
        let parsed = self
            .parsers
            .iter()
            .enumerate()
            .find_map(|(index, parser)| parser.parse(record).map(|artifact| (index, artifact)));
        match parsed {
            Some((index, artifact)) => {
                tracing::trace!(path = %record.relative_path, parser = index, "Parsed remote artifact");
                Some(artifact)
            },
            None => {
                tracing::debug!(path = %record.relative_path, parsers = self.parsers.len(), "No parser recognised artifact");
                None
            },
        }
    }

    /// Decode a JSON record and parse it.
    ///
    /// # Errors
    /// Only when the JSON itself is malformed. An unrecognised record is
    /// `Ok(None)`.
    pub fn parse_json(&self, json: impl AsRef<str>) -> Result<Option<Arc<dyn RemoteArtifact>>> {
        let record = OutputArtifactRecord::from_json(json)?;
        Ok(self.parse(&record))
    }

    /// Parse `record`, falling back to a local artifact under `output_root`
    /// when no parser recognises it.
    pub fn resolve(&self, record: &OutputArtifactRecord, output_root: impl AsRef<Path>) -> ArtifactRecord {
        if let Some(remote) = self.parse(record) {
            return ArtifactRecord::Remote(remote);
        }
        let mut local =
            LocalArtifact::under(output_root, &record.relative_path).with_sync_time(record.sync_start_time_millis);
        if let Ok(hash) = HashId::new(&record.hash_id) {
            local = local.with_hash_id(hash);
        }
        ArtifactRecord::Local(local)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry").field("parsers", &self.parsers.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Blob;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Tagged {
        tag: &'static str,
        path: String,
        hash: HashId,
        time: i64,
    }

    #[async_trait]
    impl RemoteArtifact for Tagged {
        fn relative_path(&self) -> &str {
            &self.path
        }
        fn hash_id(&self) -> &HashId {
            &self.hash
        }
        fn sync_time_millis(&self) -> i64 {
            self.time
        }
        fn prefetch(&self) {}
        async fn fetch(&self) -> crate::error::Result<Blob> {
            Ok(Blob::from(self.tag.as_bytes()))
        }
    }

    /// Recognises records whose path ends in `suffix` and counts how often
    /// it is asked.
    struct Suffix {
        tag: &'static str,
        suffix: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl Suffix {
        fn new(tag: &'static str, suffix: &'static str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (Self { tag, suffix, calls: calls.clone() }, calls)
        }
    }

    impl ArtifactParser for Suffix {
        fn parse(&self, record: &OutputArtifactRecord) -> Option<Arc<dyn RemoteArtifact>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !record.relative_path.ends_with(self.suffix) {
                return None;
            }
            Some(Arc::new(Tagged {
                tag: self.tag,
                path: record.relative_path.clone(),
                hash: HashId::new(&record.hash_id).ok()?,
                time: record.sync_start_time_millis,
            }))
        }
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let (jars, jar_calls) = Suffix::new("jars", ".jar");
        let (all, all_calls) = Suffix::new("all", "");
        let registry = ParserRegistry::new().with(jars).with(all);

        let record = OutputArtifactRecord::new("foo/lib.jar", "h1", 7);
        let artifact = registry.parse(&record).unwrap();
        assert_eq!(&*artifact.fetch().await.unwrap(), b"jars");
        assert_eq!(jar_calls.load(Ordering::SeqCst), 1);
        assert_eq!(all_calls.load(Ordering::SeqCst), 0);

        let record = OutputArtifactRecord::new("foo/res.zip", "h2", 7);
        let artifact = registry.parse(&record).unwrap();
        assert_eq!(&*artifact.fetch().await.unwrap(), b"all");
        assert_eq!(jar_calls.load(Ordering::SeqCst), 2);
        assert_eq!(all_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_all_parsers_decline() {
        let (jars, jar_calls) = Suffix::new("jars", ".jar");
        let (aars, aar_calls) = Suffix::new("aars", ".aar");
        let registry = ParserRegistry::new().with(jars).with(aars);
        assert!(registry.parse(&OutputArtifactRecord::new("foo.zip", "h", 0)).is_none());
        assert_eq!(jar_calls.load(Ordering::SeqCst), 1);
        assert_eq!(aar_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ParserRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.parse(&OutputArtifactRecord::new("foo.jar", "h", 0)).is_none());
    }

    #[test]
    fn test_closure_parser() {
        let mut registry = ParserRegistry::new();
        registry.register(|_: &OutputArtifactRecord| -> Option<Arc<dyn RemoteArtifact>> { None });
        assert_eq!(registry.len(), 1);
        assert!(registry.parse(&OutputArtifactRecord::new("foo.jar", "h", 0)).is_none());
    }

    #[test]
    fn test_round_trip_through_json() {
        let (jars, _) = Suffix::new("jars", ".jar");
        let registry = ParserRegistry::new().with(jars);
        let parsed = registry.parse(&OutputArtifactRecord::new("x/k8/lib.jar", "abc", 1234)).unwrap();

        let json = crate::to_record(&*parsed).to_json().unwrap();
        let restored = registry.parse_json(&json).unwrap().unwrap();
        assert_eq!(restored.relative_path(), parsed.relative_path());
        assert_eq!(restored.hash_id(), parsed.hash_id());
        assert_eq!(restored.sync_time_millis(), parsed.sync_time_millis());
        assert_eq!(crate::artifact_state(&*restored), crate::artifact_state(&*parsed));
    }

    #[test]
    fn test_parse_json_distinguishes_malformed_from_unrecognised() {
        let registry = ParserRegistry::new();
        let unrecognised = r#"{"relativePath":"a.jar","hashId":"h","syncStartTimeMillis":1}"#;
        assert!(registry.parse_json(unrecognised).unwrap().is_none());
        let err = registry.parse_json("{").unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidRecord);
    }

    #[test]
    fn test_resolve_falls_back_to_local() {
        let (jars, _) = Suffix::new("jars", ".jar");
        let registry = ParserRegistry::new().with(jars);

        let remote = registry.resolve(&OutputArtifactRecord::new("a/lib.jar", "h1", 5), "/out");
        assert!(remote.is_remote());

        let local = registry.resolve(&OutputArtifactRecord::new("a/res.zip", "h2", 5), "/out");
        let ArtifactRecord::Local(local) = local else {
            panic!("expected a local artifact");
        };
        assert_eq!(local.path(), Path::new("/out/a/res.zip"));
        assert_eq!(local.hash_id().map(HashId::as_str), Some("h2"));
        assert_eq!(local.sync_time_millis(), Some(5));
    }
}
