//! Serialized forms of remote artifacts.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::{Deserialize, Serialize};

/// Structural record a remote artifact is persisted as between syncs.
///
/// Carries exactly the identity of the artifact; any runtime-only state (an
/// open handle to the remote cache, for example) is re-attached by the
/// [`ArtifactParser`](crate::ArtifactParser) that decodes it.
///
/// ```
/// use outsync_artifact::OutputArtifactRecord;
///
/// let json = r#"{"relativePath":"foo/k8/lib.jar","hashId":"abc123","syncStartTimeMillis":1700000000000}"#;
/// let record = OutputArtifactRecord::from_json(json).unwrap();
/// assert_eq!(record.relative_path, "foo/k8/lib.jar");
/// assert_eq!(record.to_json().unwrap(), json);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputArtifactRecord {
    /// Path relative to the build output tree.
    pub relative_path: String,
    /// Content hash, unvalidated. Parsers decide whether they understand it.
    pub hash_id: String,
    /// When the sync that observed this artifact started.
    pub sync_start_time_millis: i64,
}
impl OutputArtifactRecord {
    pub fn new(relative_path: impl Into<String>, hash_id: impl Into<String>, sync_start_time_millis: i64) -> Self {
        Self {
            relative_path: relative_path.into(),
            hash_id: hash_id.into(),
            sync_start_time_millis,
        }
    }

    pub fn from_json(json: impl AsRef<str>) -> Result<Self> {
        serde_json::from_str(json.as_ref()).or_raise(|| ErrorKind::InvalidRecord)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).or_raise(|| ErrorKind::InvalidRecord)
    }
}

/// What the incremental sync remembers about an artifact.
///
/// Two states describe the same, unchanged artifact when their key and hash
/// agree. The sync time records when the artifact was observed and says
/// nothing about its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactState {
    pub key: String,
    pub hash_id: String,
    pub sync_time_millis: i64,
}
impl ArtifactState {
    /// Whether this artifact is unchanged since `previous` was recorded.
    pub fn is_unchanged(&self, previous: &ArtifactState) -> bool {
        self.key == previous.key && self.hash_id == previous.hash_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"relativePath":"a.jar","hashId":"h","syncStartTimeMillis":1}"#, OutputArtifactRecord::new("a.jar", "h", 1))]
    #[case(
        r#"{"relativePath":"x/armv7a/lib.jar","hashId":"","syncStartTimeMillis":-5}"#,
        OutputArtifactRecord::new("x/armv7a/lib.jar", "", -5)
    )]
    fn test_record_deserialize(#[case] input: &str, #[case] expected: OutputArtifactRecord) {
        assert_eq!(OutputArtifactRecord::from_json(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("not json")]
    #[case(r#"{"relativePath":"a.jar"}"#)]
    #[case(r#"{"relativePath":"a.jar","hashId":7,"syncStartTimeMillis":1}"#)]
    fn test_record_malformed(#[case] input: &str) {
        let err = OutputArtifactRecord::from_json(input).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidRecord);
    }

    #[test]
    fn test_state_unchanged_ignores_sync_time() {
        let before = ArtifactState { key: "a.jar".into(), hash_id: "h1".into(), sync_time_millis: 1 };
        let later = ArtifactState { sync_time_millis: 99, ..before.clone() };
        assert!(later.is_unchanged(&before));
        let rebuilt = ArtifactState { hash_id: "h2".into(), ..before.clone() };
        assert!(!rebuilt.is_unchanged(&before));
        let moved = ArtifactState { key: "b.jar".into(), ..before.clone() };
        assert!(!moved.is_unchanged(&before));
    }
}
