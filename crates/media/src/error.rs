//! Media Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, same shape as the storage crate's.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A media error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Everything in here is per-file recoverable from the pipeline's point of
/// view: a failed thumbnail or transcode is logged and skipped, never fatal
/// to the batch.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Source could not be decoded as an image of the expected format
    #[display("failed to decode image: {}", _0.display())]
    Decode(#[error(not(source))] PathBuf),
    /// Resized image could not be re-encoded
    #[display("failed to encode thumbnail")]
    Encode,
    /// No usable ffmpeg executable on this system
    #[display("ffmpeg not detected on your system")]
    FfmpegNotFound,
    /// ffmpeg ran but did not produce usable output
    #[display("transcode failed: {_0}")]
    Transcode(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
