//! Pipeline Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, raised over the storage/media/gallery crates' own
//! error trees.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Input directory could not be walked. Configuration error, fatal.
    #[display("failed to scan input directory: {}", _0.display())]
    Scan(#[error(not(source))] PathBuf),
    /// Source file could not be read
    #[display("failed to read source file: {}", _0.display())]
    Read(#[error(not(source))] PathBuf),
    /// Thumbnail could not be generated for this file
    #[display("failed to generate thumbnail for: {}", _0.display())]
    Thumbnail(#[error(not(source))] PathBuf),
    /// Underlying storage operation failed
    #[display("storage operation failed")]
    Storage,
    /// Gallery manifest/page update failed
    #[display("gallery update failed")]
    Gallery,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage | Self::Gallery)
    }
}
