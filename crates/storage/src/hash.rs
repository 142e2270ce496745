//! Content hash identifiers.
//!
//! A [`HashId`] names a blob by its content. Two artifacts with the same
//! [`HashId`] are interchangeable no matter which path they were built at, which
//! is what makes it safe to share cached bytes between them.

use crate::error::{ErrorKind, Result};
use derive_more::Display;
use std::str::FromStr;

/// Longest accepted identifier. SHA-512 hex is 128 characters; nothing a
/// remote cache hands out should be longer than that.
const MAX_LEN: usize = 128;
/// Number of leading characters used as a directory shard by on-disk stores.
const SHARD_LEN: usize = 2;

/// Validated content hash.
///
/// The identifier is opaque: remote caches may use SHA-256 digests, BLAKE3
/// digests, or their own schemes. All that is enforced is that it can be used
/// verbatim as an object key or file name.
///
/// # Examples
///
/// ```
/// use outsync_storage::HashId;
/// // Valid identifiers
/// assert!(HashId::new("9f86d081884c7d659a2feaa0c55ad015").is_ok());
/// assert!(HashId::new("sha256-9f86d081_v2").is_ok());
/// // Invalid identifiers
/// assert!(HashId::new("").is_err());
/// assert!(HashId::new("../../etc/passwd").is_err());
/// assert!(HashId::new("abc def").is_err());
/// // Locally produced content is hashed with BLAKE3
/// assert_eq!(HashId::of(b"hello").as_str().len(), 64);
/// ```
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashId(String);

impl HashId {
    /// Validate and wrap an identifier handed out by a remote cache.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_LEN
            && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        match valid {
            true => Ok(Self(id)),
            false => exn::bail!(ErrorKind::InvalidHash(id)),
        }
    }

    /// BLAKE3 digest of `bytes`, hex encoded.
    pub fn of(bytes: impl AsRef<[u8]>) -> Self {
        Self(blake3::hash(bytes.as_ref()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory shard for on-disk layouts (`ab/abcdef...`).
    ///
    /// Identifiers shorter than the shard length are their own shard.
    pub fn shard(&self) -> &str {
        // Validation guarantees ASCII, so any byte index is a char boundary.
        &self.0[..SHARD_LEN.min(self.0.len())]
    }
}

impl FromStr for HashId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for HashId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("abc123")]
    #[case("9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    #[case("remote-cache_id-42")]
    #[case("A")]
    fn test_valid_ids(#[case] id: &str) {
        assert_eq!(HashId::new(id).unwrap().as_str(), id);
    }

    #[rstest]
    #[case("")]
    #[case("a/b")]
    #[case("..")]
    #[case("with space")]
    #[case("null\0byte")]
    #[case("ünïcödé")]
    fn test_invalid_ids(#[case] id: &str) {
        let err = HashId::new(id).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidHash(rejected) if rejected == id));
    }

    #[test]
    fn test_too_long() {
        assert!(HashId::new("a".repeat(MAX_LEN)).is_ok());
        assert!(HashId::new("a".repeat(MAX_LEN + 1)).is_err());
    }

    #[test]
    fn test_of_is_content_addressed() {
        assert_eq!(HashId::of(b"same bytes"), HashId::of(b"same bytes"));
        assert_ne!(HashId::of(b"same bytes"), HashId::of(b"other bytes"));
        // BLAKE3 output is already a valid identifier.
        let hash = HashId::of(b"classes.jar");
        assert_eq!(HashId::new(hash.as_str()).unwrap(), hash);
    }

    #[test]
    fn test_shard() {
        assert_eq!(HashId::new("abcdef").unwrap().shard(), "ab");
        assert_eq!(HashId::new("a").unwrap().shard(), "a");
    }

    #[test]
    fn test_parse() {
        let hash: HashId = "deadbeef".parse().unwrap();
        assert_eq!(hash.to_string(), "deadbeef");
        assert!("dead/beef".parse::<HashId>().is_err());
    }

    #[test]
    fn test_display_is_the_bare_id() {
        let hash = HashId::of(b"classes.jar");
        assert_eq!(format!("{hash}"), hash.as_str());
        assert_eq!(format!("objects/{}", HashId::new("abc").unwrap()), "objects/abc");
    }
}
