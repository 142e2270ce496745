//! Artifact Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An artifact error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for artifact operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The serialized record could not be decoded (or encoded) at all. A
    /// record that decodes fine but that no parser recognises is not an
    /// error.
    #[display("invalid serialized artifact record")]
    InvalidRecord,
    /// Reading a local artifact from disk failed.
    #[display("failed to read local artifact: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The bytes of a remote artifact could not be fetched right now.
    #[display("failed to fetch remote artifact: {_0}")]
    Fetch(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Fetch(_))
    }
}
