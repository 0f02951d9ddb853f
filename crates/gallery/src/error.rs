//! Gallery Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, same shape as the storage crate's.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A gallery error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for gallery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Underlying storage operation failed
    #[display("storage operation failed")]
    Storage,
    /// A stored manifest exists but could not be parsed.
    ///
    /// This is loud on purpose: quietly starting over from an empty
    /// document would drop every previously-listed entry on the next write.
    #[display("stored manifest is corrupt: {}", _0.display())]
    CorruptManifest(#[error(not(source))] PathBuf),
    /// Manifest could not be serialized
    #[display("failed to serialize manifest")]
    Serialize,
    /// Page template failed to compile or render
    #[display("issue with gallery page template")]
    Template,
    /// Embedded template asset missing from the binary
    #[display("embedded template not found: {_0}")]
    TemplateAsset(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage)
    }
}
