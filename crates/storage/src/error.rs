//! Storage Error Types
//!
//! One actionable `ErrorKind` per failure category, wrapped in `exn` so
//! every raise records its location and errors from lower layers stack into
//! a tree instead of getting flattened to strings.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong
/// internally. In particular `NotFound` is part of the normal control flow:
/// fetch-or-initialize callers match on it and fall back to a default,
/// everything else is a real failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No object at the given key
    #[display("no object at key: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Key contains invalid characters or escapes the backend root
    #[display("invalid key: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Access denied (filesystem permissions or bucket credentials)
    #[display("access denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O failure
    #[display("I/O failure: {_0}")]
    Io(IoError),
    /// The remote store or the connection to it failed
    #[display("remote store error: {_0}")]
    Network(#[error(not(source))] String),
    /// Anything backend-specific that has no better category, including
    /// misconfiguration (missing credentials, nonsense metadata)
    #[display("backend failure: {_0}")]
    BackendError(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed. `BackendError` is mostly
    /// misconfiguration, so it is deliberately not in this set.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_))
    }
}
