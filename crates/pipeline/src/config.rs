use shoebox_media::{Classifier, THUMB_WIDTH};

/// Everything that tunes a run, passed down explicitly.
///
/// The knobs the CLI exposes end up here instead of in process-wide flags,
/// so per-call behaviour is overridable and testable in isolation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Re-upload files that already exist remotely.
    pub overwrite: bool,
    /// Skip the pre-upload video re-encode and upload originals as-is.
    pub keep_videos: bool,
    /// Bound on concurrently processed files within a date bucket.
    pub concurrency: usize,
    /// Width of generated thumbnails.
    pub thumb_width: u32,
    /// Extension classification settings.
    pub classifier: Classifier,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            keep_videos: false,
            concurrency: 8,
            thumb_width: THUMB_WIDTH,
            classifier: Classifier::default(),
        }
    }
}
