//! The batch orchestrator.
//!
//! Buckets are processed one at a time, in date order. Within a bucket,
//! per-file work fans out over a bounded set of in-flight futures, and the
//! bucket's manifest update only starts once every file has settled. One
//! bucket at a time is the entire manifest-concurrency story: the updater
//! does read-modify-write on shared JSON documents and this loop is the
//! only writer.

use crate::config::RunConfig;
use crate::error::{ErrorKind, Result};
use crate::scan::{DateBuckets, MediaFile, scan};
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use shoebox_gallery::{Pages, layout, update_folder};
use shoebox_media::error::Result as MediaResult;
use shoebox_media::{Ffmpeg, MediaKind, photo_thumbnail, thumb_name};
use shoebox_storage::BackendHandle;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use time::Date;

/// Summary of one pipeline run.
///
/// Per-file hard failures land in `failures` instead of aborting the batch;
/// skip-if-exists makes re-running the same input cheap, so the operator
/// fixes what failed and goes again.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Objects uploaded to the remote bucket (originals, not thumbnails)
    pub uploaded: usize,
    /// Files copied into the local mirror
    pub copied: usize,
    /// Files skipped because they already existed remotely
    pub skipped: usize,
    /// Videos uploaded without a thumbnail because ffmpeg is unavailable
    pub thumbs_skipped: usize,
    /// Files that failed outright, with the reason
    pub failures: Vec<(PathBuf, String)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct FileOutcome {
    uploaded: bool,
    copied: bool,
    skipped: bool,
    thumb_skipped: bool,
}

/// Ties scanning, media work, storage and gallery updates together for one
/// batch run.
pub struct Orchestrator {
    config: RunConfig,
    local: Option<BackendHandle>,
    remote: Option<(BackendHandle, Pages)>,
    ffmpeg: Option<Ffmpeg>,
}

impl Orchestrator {
    /// Create an orchestrator with no targets configured. ffmpeg is
    /// discovered here; running without it costs video thumbnails and the
    /// re-encode step, nothing else.
    pub fn new(config: RunConfig) -> Self {
        let ffmpeg = match Ffmpeg::discover() {
            Ok(ffmpeg) => Some(ffmpeg),
            Err(_) => {
                tracing::warn!("ffmpeg not found; video thumbnails and re-encoding are disabled");
                None
            },
        };
        Self {
            config,
            local: None,
            remote: None,
            ffmpeg,
        }
    }

    /// Mirror processed files into a local backend.
    pub fn with_local(mut self, backend: BackendHandle) -> Self {
        self.local = Some(backend);
        self
    }

    /// Upload processed files to a remote backend and maintain its gallery.
    pub fn with_remote(mut self, backend: BackendHandle, pages: Pages) -> Self {
        self.remote = Some((backend, pages));
        self
    }

    /// Run the full batch: scan, filter, fan out per-file work bucket by
    /// bucket, and update gallery manifests as each bucket completes.
    pub async fn run(&self, input: &Path) -> Result<RunReport> {
        let mut buckets = scan(input, self.config.classifier)?;
        let total: usize = buckets.values().map(Vec::len).sum();
        tracing::info!(buckets = buckets.len(), files = total, input = %input.display(), "Scan complete");

        let mut report = RunReport::default();
        if let Some((remote, _)) = &self.remote
            && !self.config.overwrite
        {
            self.filter_uploaded(&mut buckets, remote, &mut report).await?;
        }

        for (date, files) in &buckets {
            let processed = self.process_bucket(*date, files, &mut report).await;
            // A day where every file failed publishes nothing, so don't
            // create an empty gallery page for it either.
            if processed > 0
                && let Some((remote, pages)) = &self.remote
            {
                update_folder(remote, pages, *date).await.or_raise(|| ErrorKind::Gallery)?;
            }
        }

        tracing::info!(
            uploaded = report.uploaded,
            copied = report.copied,
            skipped = report.skipped,
            failed = report.failures.len(),
            "Run complete"
        );
        Ok(report)
    }

    /// Drop files whose base name already exists in their remote day folder,
    /// and whole buckets that end up empty (no pointless manifest work).
    async fn filter_uploaded(
        &self,
        buckets: &mut DateBuckets,
        remote: &BackendHandle,
        report: &mut RunReport,
    ) -> Result<()> {
        let mut emptied = Vec::new();
        for (date, files) in buckets.iter_mut() {
            let listing = remote.list(Some(&layout::day_prefix(*date))).await.or_raise(|| ErrorKind::Storage)?;
            let existing: HashSet<String> = listing.iter().map(|info| info.base_name().to_string()).collect();
            files.retain(|file| {
                if existing.contains(&file.name) {
                    tracing::info!(path = %file.path.display(), "Already uploaded; skipping");
                    report.skipped += 1;
                    false
                } else {
                    true
                }
            });
            if files.is_empty() {
                emptied.push(*date);
            }
        }
        for date in emptied {
            buckets.remove(&date);
            tracing::info!(folder = %layout::day(date), "Nothing new for this day; skipping folder");
        }
        Ok(())
    }

    /// Fan the bucket's files out over at most `concurrency` in-flight
    /// operations and wait for all of them. Returns how many files made it
    /// through without a recorded failure.
    async fn process_bucket(&self, date: Date, files: &[MediaFile], report: &mut RunReport) -> usize {
        tracing::info!(folder = %layout::day(date), files = files.len(), "Processing bucket");
        let mut processed = 0;
        let mut queue: Vec<_> = files.iter().map(|file| self.process_file(file)).collect();
        let mut in_flight = FuturesUnordered::new();
        let initial = self.config.concurrency.max(1).min(queue.len());
        in_flight.extend(queue.drain(..initial));
        while let Some((path, result)) = in_flight.next().await {
            match result {
                Ok(outcome) => {
                    processed += 1;
                    report.uploaded += usize::from(outcome.uploaded);
                    report.copied += usize::from(outcome.copied);
                    report.skipped += usize::from(outcome.skipped);
                    report.thumbs_skipped += usize::from(outcome.thumb_skipped);
                    tracing::info!(path = %path.display(), "Processed file");
                },
                Err(e) => {
                    let reason = (*e).to_string();
                    tracing::error!(path = %path.display(), error = %reason, "Failed to process file");
                    report.failures.push((path, reason));
                },
            }
            // Pop-n-push, but FIFO instead of LIFO.
            if !queue.is_empty() {
                in_flight.push(queue.remove(0));
            }
        }
        processed
    }

    async fn process_file(&self, file: &MediaFile) -> (PathBuf, Result<FileOutcome>) {
        let result = self.process_file_inner(file).await;
        (file.path.clone(), result)
    }

    async fn process_file_inner(&self, file: &MediaFile) -> Result<FileOutcome> {
        let mut outcome = FileOutcome::default();
        let key = layout::object_key(file.date, &file.name);

        // Best-effort pre-upload re-encode. The temp file guard has to
        // outlive every read of `source` below.
        let mut source = file.path.clone();
        let mut _transcoded: Option<NamedTempFile> = None;
        if file.kind == MediaKind::Video
            && !self.config.keep_videos
            && self.remote.is_some()
            && let Some(ffmpeg) = &self.ffmpeg
        {
            match ffmpeg.shrink(&source).await {
                Ok(Some(temp)) => {
                    source = temp.path().to_path_buf();
                    _transcoded = Some(temp);
                },
                Ok(None) => {},
                Err(e) => {
                    let reason = (*e).to_string();
                    tracing::warn!(path = %file.path.display(), error = %reason, "Video re-encode failed; keeping original");
                },
            }
        }

        let bytes = tokio::fs::read(&source).await.or_raise(|| ErrorKind::Read(file.path.clone()))?;

        if let Some(local) = &self.local {
            local.write(&key, &bytes).await.or_raise(|| ErrorKind::Storage)?;
            outcome.copied = true;
            tracing::info!(path = %file.path.display(), key = %key.display(), target = local.name(), "Copied file");
        }

        if let Some((remote, _)) = &self.remote {
            // Thumbnail before upload: a file whose thumbnail cannot be
            // generated fails whole, instead of leaving a broken entry on
            // the gallery page. Its siblings are unaffected.
            let thumbnail = self.thumbnail(file, &source).await.or_raise(|| ErrorKind::Thumbnail(file.path.clone()))?;

            let uploaded = if self.config.overwrite {
                remote.write(&key, &bytes).await.or_raise(|| ErrorKind::Storage)?;
                true
            } else {
                remote.write_new(&key, &bytes).await.or_raise(|| ErrorKind::Storage)?
            };
            if uploaded {
                outcome.uploaded = true;
                tracing::info!(key = %key.display(), bucket = remote.name(), "Uploaded file");
            } else {
                outcome.skipped = true;
                tracing::info!(key = %key.display(), "Already uploaded; skipped");
            }

            match thumbnail {
                Some(thumb) => {
                    let thumb_key = layout::object_key(file.date, &thumb_name(&file.name));
                    if self.config.overwrite {
                        remote.write(&thumb_key, &thumb).await.or_raise(|| ErrorKind::Storage)?;
                    } else {
                        remote.write_new(&thumb_key, &thumb).await.or_raise(|| ErrorKind::Storage)?;
                    }
                },
                None => {
                    if file.kind == MediaKind::Video {
                        outcome.thumb_skipped = true;
                        tracing::warn!(path = %file.path.display(), "ffmpeg unavailable; uploaded without thumbnail");
                    }
                },
            }
        }

        Ok(outcome)
    }

    /// Generate a thumbnail buffer for the file, or `None` when no
    /// thumbnailer is available for its kind (video without ffmpeg).
    async fn thumbnail(&self, file: &MediaFile, source: &Path) -> MediaResult<Option<Vec<u8>>> {
        match file.kind {
            MediaKind::Photo => {
                let path = source.to_path_buf();
                let width = self.config.thumb_width;
                // Decode and resize are CPU-bound; keep them off the async workers.
                tokio::task::spawn_blocking(move || photo_thumbnail(&path, width))
                    .await
                    .map_err(|e| shoebox_media::error::ErrorKind::Io(std::io::Error::other(e)))?
                    .map(Some)
            },
            MediaKind::Video => match &self.ffmpeg {
                Some(ffmpeg) => ffmpeg.frame(source, self.config.thumb_width).await.map(Some),
                None => Ok(None),
            },
            MediaKind::Other => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoebox_gallery::FolderManifest;
    use shoebox_storage::backend::{LocalBackend, MockBackend};
    use std::sync::Arc;

    fn write_jpeg(path: &Path) {
        let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(320, 240, image::Rgb([10, 120, 200])));
        image.save_with_format(path, image::ImageFormat::Jpeg).unwrap();
    }

    fn orchestrator_without_ffmpeg(config: RunConfig) -> Orchestrator {
        let mut orchestrator = Orchestrator::new(config);
        // Pin the no-ffmpeg behaviour so tests don't depend on the host.
        orchestrator.ffmpeg = None;
        orchestrator
    }

    async fn read_folder_manifest(backend: &BackendHandle) -> FolderManifest {
        let raw = backend.read(Path::new("2021/2021-03-05/photos.json")).await.unwrap();
        serde_json::from_slice(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_photo_and_video() {
        let input = tempfile::tempdir().unwrap();
        write_jpeg(&input.path().join("20210305_photo1.jpg"));
        std::fs::write(input.path().join("20210305_clip1.mp4"), b"not a real video").unwrap();

        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap());

        let report = orchestrator.run(input.path()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.thumbs_skipped, 1);

        let expected: Vec<PathBuf> = [
            "2021/2021-03-05/20210305_clip1.mp4",
            "2021/2021-03-05/20210305_photo1.jpg",
            "2021/2021-03-05/20210305_photo1_thumb.jpg",
            "2021/2021-03-05/index.html",
            "2021/2021-03-05/photos.json",
            "2021/dates.json",
            "2021/index.html",
            "index.html",
            "years.json",
        ]
        .map(PathBuf::from)
        .to_vec();
        assert_eq!(mock.keys().await, expected);

        let manifest = read_folder_manifest(&backend).await;
        assert_eq!(manifest.files, vec!["20210305_clip1.mp4", "20210305_photo1.jpg"]);
    }

    #[tokio::test]
    async fn test_second_run_uploads_nothing() {
        let input = tempfile::tempdir().unwrap();
        write_jpeg(&input.path().join("20210305_photo1.jpg"));
        std::fs::write(input.path().join("20210305_clip1.mp4"), b"not a real video").unwrap();

        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap());

        let first = orchestrator.run(input.path()).await.unwrap();
        assert!(first.is_success());
        let writes_after_first = mock.writes();

        let second = orchestrator.run(input.path()).await.unwrap();
        assert!(second.is_success());
        assert_eq!(second.uploaded, 0);
        assert_eq!(second.skipped, 2);
        // Zero new objects, zero manifest churn.
        assert_eq!(mock.writes(), writes_after_first);
    }

    #[tokio::test]
    async fn test_overwrite_reuploads_everything() {
        let input = tempfile::tempdir().unwrap();
        write_jpeg(&input.path().join("20210305_photo1.jpg"));

        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();

        let first = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap())
            .run(input.path())
            .await
            .unwrap();
        assert_eq!(first.uploaded, 1);

        let config = RunConfig { overwrite: true, ..RunConfig::default() };
        let second = orchestrator_without_ffmpeg(config)
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap())
            .run(input.path())
            .await
            .unwrap();
        assert_eq!(second.uploaded, 1);
        assert_eq!(second.skipped, 0);
    }

    #[tokio::test]
    async fn test_thumbnail_failure_does_not_block_siblings() {
        let input = tempfile::tempdir().unwrap();
        write_jpeg(&input.path().join("20210305_a.jpg"));
        write_jpeg(&input.path().join("20210305_b.jpg"));
        // JPEG by extension, garbage by content: thumbnailing fails.
        std::fs::write(input.path().join("20210305_broken.jpg"), b"?? not a jpeg ??").unwrap();

        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap());

        let report = orchestrator.run(input.path()).await.unwrap();
        assert_eq!(report.uploaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].0.ends_with("20210305_broken.jpg"));

        // Exactly the two good files, not three, not zero.
        let manifest = read_folder_manifest(&backend).await;
        assert_eq!(manifest.files, vec!["20210305_a.jpg", "20210305_b.jpg"]);
        assert!(!backend.exists(Path::new("2021/2021-03-05/20210305_broken.jpg")).await.unwrap());
    }

    #[tokio::test]
    async fn test_fully_failed_day_publishes_nothing() {
        let input = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("20210305_broken.jpg"), b"?? not a jpeg ??").unwrap();

        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap());

        let report = orchestrator.run(input.path()).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        // No orphaned gallery page for a day that published nothing.
        assert_eq!(mock.writes(), 0);
        assert!(mock.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_local_mirror_only() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_jpeg(&input.path().join("20210305_photo1.jpg"));
        std::fs::write(input.path().join("20210305_clip1.mp4"), b"not a real video").unwrap();

        let local: BackendHandle = Arc::new(LocalBackend::new("out", output.path()).unwrap());
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default()).with_local(local);

        let report = orchestrator.run(input.path()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.copied, 2);
        assert_eq!(report.uploaded, 0);

        assert!(output.path().join("2021/2021-03-05/20210305_photo1.jpg").is_file());
        assert!(output.path().join("2021/2021-03-05/20210305_clip1.mp4").is_file());
        // No remote, so no manifests and no thumbnails.
        assert!(!output.path().join("2021/2021-03-05/photos.json").exists());
        assert!(!output.path().join("2021/2021-03-05/20210305_photo1_thumb.jpg").exists());
    }

    #[tokio::test]
    async fn test_empty_input_performs_zero_remote_operations() {
        let input = tempfile::tempdir().unwrap();
        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap());

        let report = orchestrator.run(input.path()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.uploaded + report.copied + report.skipped, 0);
        assert_eq!(mock.writes(), 0);
        assert!(mock.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_days_update_year_manifest_once_per_day() {
        let input = tempfile::tempdir().unwrap();
        write_jpeg(&input.path().join("20210305_a.jpg"));
        write_jpeg(&input.path().join("20210306_b.jpg"));

        let mock = Arc::new(MockBackend::default());
        let backend: BackendHandle = mock.clone();
        let orchestrator = orchestrator_without_ffmpeg(RunConfig::default())
            .with_remote(backend.clone(), Pages::new("mybucket").unwrap());

        orchestrator.run(input.path()).await.unwrap();

        let raw = backend.read(Path::new("2021/dates.json")).await.unwrap();
        let year: shoebox_gallery::YearManifest = serde_json::from_slice(&raw).unwrap();
        let dates: Vec<_> = year.dates.iter().map(|entry| entry.date.as_str()).collect();
        assert_eq!(dates, vec!["2021-03-05", "2021-03-06"]);
    }
}
