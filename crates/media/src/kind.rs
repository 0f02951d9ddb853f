use std::path::Path;

/// What kind of media a file is, judged purely by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Other,
}

/// Video extensions the pipeline picks up.
const VIDEO_EXTENSIONS: [&str; 6] = ["mpg", "mpeg", "avi", "mp4", "3gp", "mov"];

/// Extension-based media classifier.
///
/// A plain value passed down the call chain rather than process-wide flags,
/// so tests can construct variants side by side and nothing mutates shared
/// state.
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    /// Recognize `.jpeg` in addition to `.jpg` as a photo.
    pub jpeg_variants: bool,
}
impl Default for Classifier {
    fn default() -> Self {
        Self { jpeg_variants: true }
    }
}

impl Classifier {
    /// Classify a file name. Case-insensitive, pure function of the
    /// extension.
    pub fn classify(&self, name: impl AsRef<Path>) -> MediaKind {
        let Some(ext) = name.as_ref().extension().and_then(|e| e.to_str()) else {
            return MediaKind::Other;
        };
        let ext = ext.to_ascii_lowercase();
        if ext == "jpg" || (self.jpeg_variants && ext == "jpeg") {
            MediaKind::Photo
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("photo.jpg", MediaKind::Photo)]
    #[case("photo.JPG", MediaKind::Photo)]
    #[case("photo.jpeg", MediaKind::Photo)]
    #[case("photo.JPEG", MediaKind::Photo)]
    #[case("clip.mpg", MediaKind::Video)]
    #[case("clip.mpeg", MediaKind::Video)]
    #[case("clip.avi", MediaKind::Video)]
    #[case("clip.mp4", MediaKind::Video)]
    #[case("clip.3gp", MediaKind::Video)]
    #[case("clip.mov", MediaKind::Video)]
    #[case("clip.MOV", MediaKind::Video)]
    #[case("notes.txt", MediaKind::Other)]
    #[case("archive.png", MediaKind::Other)]
    #[case("no_extension", MediaKind::Other)]
    #[case(".hidden", MediaKind::Other)]
    fn test_classify_default(#[case] name: &str, #[case] expected: MediaKind) {
        assert_eq!(Classifier::default().classify(name), expected);
    }

    #[test]
    fn test_classify_ignores_directories_in_path() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("some/dir.mp4/photo.jpg"), MediaKind::Photo);
    }

    #[test]
    fn test_jpeg_variants_flag() {
        let strict = Classifier { jpeg_variants: false };
        assert_eq!(strict.classify("photo.jpg"), MediaKind::Photo);
        assert_eq!(strict.classify("photo.jpeg"), MediaKind::Other);
        assert_eq!(strict.classify("photo.JPEG"), MediaKind::Other);
    }
}
