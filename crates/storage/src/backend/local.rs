//! Local filesystem storage backend.
//!
//! Backs the `-o` output-directory mirror: the same date-keyed layout that
//! goes to the bucket is written under a local root, via `tokio::fs`.

use crate::backend::FileInfoStream;
use crate::error::ErrorKind;
use crate::{FileInfo, StorageBackend, error::Result, path::validate as validate_path};
use async_stream::stream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage backend.
///
/// Stores objects as files under a configured root directory. All keys are
/// relative to that root.
///
/// # Examples
///
/// ```no_run
/// use shoebox_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("mirror", "/absolute/path/to/photos")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory for the mirror
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend rooted at an absolute path.
    ///
    /// The root is created if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists but is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Blocking call, once, before the pipeline starts. Keeps the
            // constructor synchronous.
            std::fs::create_dir_all(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    /// Get the absolute path for a relative storage key.
    fn absolute_path(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_path(path.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Read one directory's entries, sorted by name so listings come out in
    /// the same lexicographic order S3 produces.
    async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            // Asking for the contents of a directory that doesn't exist
            // results in an empty list, not an error, to stay consistent
            // with the behaviour of S3-compatible backends.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Self::map_io_error(err, dir).into()),
        };
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, dir))? {
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let start_dir = match prefix.map(|p| self.absolute_path(p)).transpose() {
            Ok(dir) => dir.unwrap_or_else(|| self.root.clone()),
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };

        Box::pin(stream! {
            // Depth-first walk. The per-directory sort keeps each folder's
            // objects in lexicographic order, which is all the callers
            // depend on; cross-directory order is walk order.
            let mut stack = vec![start_dir];
            while let Some(current) = stack.pop() {
                let entries = match Self::sorted_entries(&current).await {
                    Ok(entries) => entries,
                    Err(e) => { yield Err(e); continue; },
                };
                for entry in entries {
                    let metadata = match fs::metadata(&entry).await {
                        Ok(metadata) => metadata,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &entry))); continue; },
                    };
                    if metadata.is_dir() {
                        stack.push(entry);
                    } else if metadata.is_file() {
                        let Ok(relative) = entry.strip_prefix(&self.root) else {
                            yield Err(exn::Exn::from(ErrorKind::BackendError(format!(
                                "walked path `{}` is not within root `{}`",
                                entry.display(),
                                self.root.display(),
                            ))));
                            continue;
                        };
                        // No `?` inside stream blocks; errors have to be
                        // converted and yielded by hand.
                        match metadata.modified() {
                            Ok(modified) => yield Ok(FileInfo::new(relative, metadata.len(), modified.into())),
                            Err(e) => yield Err(exn::Exn::from(ErrorKind::Io(e))),
                        }
                    }
                    // Anything else is most likely a broken symlink; drop it.
                }
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::try_exists(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(path)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(path)?;
        // Keys contain their date folders; create them on demand to keep
        // behaviour consistent with S3-compatible storage.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, path))?;
        }
        fs::write(&abs_path, data).await.map_err(|e| Self::map_io_error(e, path))?;
        tracing::debug!(path = %abs_path.display(), bytes = data.len(), "Wrote file");
        Ok(())
    }
}
