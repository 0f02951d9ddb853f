//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, a unified interface over
//! the places this tool writes gallery content: an S3-compatible bucket, a
//! local mirror directory, or an in-memory store for tests.

mod local;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;

/// Unified interface for storage backends.
///
/// All operations are asynchronous so that the S3 backend can share a
/// signature with the local one. The surface is deliberately small: this
/// tool only ever lists, reads, and adds objects. Nothing deletes or moves.
///
/// # Key Handling
/// All keys are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use shoebox_storage::{backend::StorageBackend, error::Result};
///
/// async fn folder_object_count(backend: &dyn StorageBackend) -> Result<usize> {
///     let objects = backend.list(Some(Path::new("2021/2021-03-05"))).await?;
///     Ok(objects.len())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging only.
    fn name(&self) -> &str;

    /// Stream object metadata matching an optional key prefix.
    ///
    /// The prefix is interpreted as a folder path: `2021/2021-03-05` matches
    /// objects *under* that folder, not sibling keys that merely share the
    /// string prefix. Listing a prefix with no objects yields an empty
    /// stream, not an error (S3 semantics; other backends match them).
    ///
    /// Within a single folder, implementations yield keys in lexicographic
    /// order. Thumbnail selection for gallery pages relies on this being
    /// deterministic.
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a>;

    /// List all objects matching an optional prefix.
    ///
    /// Convenience wrapper that collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`] before returning.
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<FileInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Check if an object exists at the exact key.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read an object's complete contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the object
    /// does not exist. Callers that treat absence as "start from empty"
    /// (manifest fetch-or-initialize) match on that kind explicitly; any
    /// other error means the fetch actually failed.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write an object, replacing any existing content at the key.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed, to keep the
    ///   local mirror consistent with flat S3 keys.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Write an object only if the key is not already occupied.
    ///
    /// Returns `true` iff the write happened. This is a check-then-write
    /// with no cross-process atomicity; the pipeline assumes a single
    /// writer per run.
    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<bool> {
        if self.exists(path).await? {
            return Ok(false);
        }
        self.write(path, data).await?;
        Ok(true)
    }
}
