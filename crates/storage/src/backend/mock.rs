//! In-memory storage backend for testing.

use super::FileInfoStream;
use crate::StorageBackend;
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::validate as validate_path;
use async_stream::stream;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Objects live in a `BTreeMap` behind a [`RwLock`], so all trait methods
/// operate on `&self` without external synchronisation, and listings come
/// out in sorted key order just like S3's.
///
/// The backend counts `write` calls; tests assert re-run idempotence by
/// checking that the counter does not move on a second pipeline run.
///
/// # Examples
///
/// ```
/// use shoebox_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("2021/2021-03-05/photo1.jpg", b"\xFF\xD8\xFF..."),
/// ]);
/// assert!(backend.exists(Path::new("2021/2021-03-05/photo1.jpg")).await?);
/// assert_eq!(backend.writes(), 0);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<BTreeMap<PathBuf, (OffsetDateTime, Vec<u8>)>>,
    writes: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Pre-populated objects do not count towards [`writes()`](Self::writes).
    /// Panics if any key fails validation; this type only ever runs inside
    /// tests, and a bad fixture key should fail the test immediately.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let now = OffsetDateTime::now_utc();
        let storage = files
            .into_iter()
            .map(|(path, data)| {
                let path = path.into();
                match validate_path(&path) {
                    Ok(validated) => (validated, (now, data.into())),
                    Err(_) => panic!("MockBackend::with_files: invalid key {}", path.display()),
                }
            })
            .collect();
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(storage),
            writes: AtomicUsize::new(0),
        }
    }

    /// Rename the backend; it shows up in logs under this name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of `write` calls made against this backend so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// All keys currently stored, in sorted order. Assertion helper.
    pub async fn keys(&self) -> Vec<PathBuf> {
        self.storage.read().await.keys().cloned().collect()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        Self::with_files(std::iter::empty::<(PathBuf, Vec<u8>)>())
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Copy the matching entries out and release the lock before the
            // first yield; holding it across yield points would block writers
            // for as long as the consumer dawdles.
            let entries: Vec<(PathBuf, OffsetDateTime, u64)> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(path, _)| match &validated_prefix {
                        Some(pfx) => path.starts_with(pfx),
                        None => true,
                    })
                    .map(|(path, (modified, data))| (path.clone(), *modified, data.len() as u64))
                    .collect()
            };
            for (path, modified, size) in entries {
                yield Ok(FileInfo::new(path, size, modified));
            }
        })
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let path = validate_path(path)?;
        match self.storage.read().await.get(&path) {
            Some((_modified, data)) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::NotFound(path)),
        }
    }

    async fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let path = validate_path(path)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.storage.write().await.insert(path, (OffsetDateTime::now_utc(), data.to_vec()));
        Ok(())
    }
}
