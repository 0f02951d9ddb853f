//! Input directory scanning.
//!
//! Walks the input tree once, classifies every file, resolves its capture
//! date, and groups the photo/video files into per-day buckets. The buckets
//! are ordered, so the pipeline processes days chronologically.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shoebox_media::{Classifier, MediaKind, capture_date};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::Date;
use walkdir::{DirEntry, WalkDir};

/// One discovered source file.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Absolute (or input-relative) path on the local filesystem
    pub path: PathBuf,
    /// Base file name, which becomes the object name in the day folder
    pub name: String,
    pub kind: MediaKind,
    pub date: Date,
}

/// Files grouped by capture day, in ascending date order.
pub type DateBuckets = BTreeMap<Date, Vec<MediaFile>>;

fn is_hidden(entry: &DirEntry) -> bool {
    // Never prune the walk root itself, even if the input directory is
    // something like `.photos`.
    entry.depth() > 0 && entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Recursively scan `root`, returning photo/video files bucketed by
/// capture day.
///
/// Dot-prefixed files and directories are skipped; everything that doesn't
/// classify as a photo or video is silently ignored. An unreadable root (or
/// an unreadable subdirectory mid-walk) is a configuration error and fails
/// the scan.
pub fn scan(root: &Path, classifier: Classifier) -> Result<DateBuckets> {
    let mut buckets = DateBuckets::new();
    for entry in WalkDir::new(root).into_iter().filter_entry(|entry| !is_hidden(entry)) {
        let entry = entry.or_raise(|| ErrorKind::Scan(root.to_path_buf()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let kind = classifier.classify(entry.path());
        if kind == MediaKind::Other {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!(path = %entry.path().display(), "Skipping file with non-UTF-8 name");
            continue;
        };
        let date = capture_date(entry.path(), kind);
        tracing::debug!(path = %entry.path().display(), kind = ?kind, date = %date, "Discovered file");
        buckets.entry(date).or_default().push(MediaFile {
            path: entry.into_path(),
            name,
            kind,
            date,
        });
    }
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_empty_directory_scans_to_empty_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let buckets = scan(dir.path(), Classifier::default()).unwrap();
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let err = scan(Path::new("/definitely/not/here"), Classifier::default()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Scan(_)));
    }

    #[test]
    fn test_groups_by_filename_date() {
        let dir = tempfile::tempdir().unwrap();
        // Date-prefixed names pin the buckets regardless of mtime.
        std::fs::write(dir.path().join("20210305_a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("20210305_b.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("20210306_c.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let buckets = scan(dir.path(), Classifier::default()).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&date!(2021 - 03 - 05)].len(), 2);
        assert_eq!(buckets[&date!(2021 - 03 - 06)].len(), 1);
    }

    #[test]
    fn test_recurses_and_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("album")).unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join("album/20210305_a.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join(".cache/20210305_b.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join(".20210305_hidden.jpg"), b"x").unwrap();

        let buckets = scan(dir.path(), Classifier::default()).unwrap();
        let files = &buckets[&date!(2021 - 03 - 05)];
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "20210305_a.jpg");
        assert_eq!(files[0].kind, MediaKind::Photo);
    }

    #[test]
    fn test_classifier_flag_applies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("20210305_a.jpeg"), b"x").unwrap();

        let strict = Classifier { jpeg_variants: false };
        assert!(scan(dir.path(), strict).unwrap().is_empty());
        assert_eq!(scan(dir.path(), Classifier::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_buckets_are_chronological() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("20211102_late.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("20210305_early.jpg"), b"x").unwrap();

        let buckets = scan(dir.path(), Classifier::default()).unwrap();
        let dates: Vec<_> = buckets.keys().copied().collect();
        assert_eq!(dates, vec![date!(2021 - 03 - 05), date!(2021 - 11 - 02)]);
    }
}
