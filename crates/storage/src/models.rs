use std::path::PathBuf;
use time::OffsetDateTime;

/// Metadata for a single stored object, as returned by listing operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Key relative to the backend root
    pub path: PathBuf,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self { path: path.into(), size, modified }
    }

    /// Final component of the key as UTF-8.
    ///
    /// Keys are validated on the way in, so a key without a final component
    /// (or with non-UTF-8 bytes on the way out of a backend) collapses to an
    /// empty string rather than a panic.
    pub fn base_name(&self) -> &str {
        self.path.file_name().and_then(|name| name.to_str()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        let info = FileInfo::new("2021/2021-03-05/photo1.jpg", 4, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(info.base_name(), "photo1.jpg");
    }
}
