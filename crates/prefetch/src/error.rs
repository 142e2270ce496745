//! Prefetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use outsync_storage::HashId;

/// A prefetch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for prefetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// Nothing here is ever cached: the next access to the same hash goes back to
/// the remote.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote does not know this hash. Retrying is unlikely to help until
    /// the next build uploads it.
    #[display("blob {_0} not found in remote cache")]
    NotFound(#[error(not(source))] HashId),
    /// The remote could not be reached or failed mid-transfer.
    #[display("fetching {hash} failed: {reason}")]
    Fetch { hash: HashId, reason: String, retryable: bool },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound(_) => false,
            Self::Fetch { retryable, .. } => *retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_retryable() {
        let hash = HashId::new("abc").unwrap();
        assert!(!ErrorKind::NotFound(hash.clone()).is_retryable());
        let kind = ErrorKind::Fetch { hash, reason: "network error: offline".to_string(), retryable: true };
        assert!(kind.is_retryable());
        assert_eq!(kind.to_string(), "fetching abc failed: network error: offline");
    }
}
