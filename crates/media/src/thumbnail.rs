//! Photo thumbnail generation.
//!
//! Video thumbnails come from ffmpeg (see [`Ffmpeg::frame`](crate::Ffmpeg));
//! photos are decoded and resized in-process.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

/// Width of generated thumbnails; height follows the aspect ratio.
pub const THUMB_WIDTH: u32 = 160;

/// Thumbnail object name for a source file name: extension stripped,
/// `_thumb.jpg` appended. `clip1.mp4` becomes `clip1_thumb.jpg`.
pub fn thumb_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _ext)) => format!("{stem}_thumb.jpg"),
        None => format!("{file_name}_thumb.jpg"),
    }
}

/// Decode a photo as JPEG, resize to `width` preserving aspect ratio with
/// Lanczos3, and re-encode as JPEG into a buffer.
///
/// The format is pinned rather than guessed: a mislabelled non-JPEG should
/// surface as a [`Decode`](ErrorKind::Decode) error here, not as a broken
/// gallery entry later.
pub fn photo_thumbnail(path: &Path, width: u32) -> Result<Vec<u8>> {
    let file = File::open(path).map_err(ErrorKind::Io)?;
    let image = ImageReader::with_format(BufReader::new(file), ImageFormat::Jpeg)
        .decode()
        .or_raise(|| ErrorKind::Decode(path.to_path_buf()))?;
    let thumbnail = image.resize(width, u32::MAX, FilterType::Lanczos3);
    let mut out = Cursor::new(Vec::new());
    thumbnail.write_to(&mut out, ImageFormat::Jpeg).or_raise(|| ErrorKind::Encode)?;
    tracing::info!(path = %path.display(), bytes = out.get_ref().len(), "Created thumbnail");
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn write_jpeg(path: &Path, width: u32, height: u32) {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([180, 40, 40])));
        image.save_with_format(path, ImageFormat::Jpeg).unwrap();
    }

    #[test]
    fn test_thumb_name() {
        assert_eq!(thumb_name("photo1.jpg"), "photo1_thumb.jpg");
        assert_eq!(thumb_name("clip1.mp4"), "clip1_thumb.jpg");
        assert_eq!(thumb_name("archive.tar.gz"), "archive.tar_thumb.jpg");
        assert_eq!(thumb_name("noext"), "noext_thumb.jpg");
    }

    #[test]
    fn test_resizes_to_fixed_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("landscape.jpg");
        write_jpeg(&path, 640, 480);

        let buffer = photo_thumbnail(&path, 160).unwrap();
        let thumb = image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg).unwrap();
        assert_eq!(thumb.width(), 160);
        // 640x480 scaled to width 160 keeps the 4:3 ratio
        assert_eq!(thumb.height(), 120);
    }

    #[test]
    fn test_portrait_keeps_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portrait.jpg");
        write_jpeg(&path, 240, 480);

        let buffer = photo_thumbnail(&path, 160).unwrap();
        let thumb = image::load_from_memory_with_format(&buffer, ImageFormat::Jpeg).unwrap();
        assert_eq!(thumb.width(), 160);
        assert_eq!(thumb.height(), 320);
    }

    #[test]
    fn test_rejects_non_jpeg_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"this is not an image at all").unwrap();

        let err = photo_thumbnail(&path, 160).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Decode(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = photo_thumbnail(Path::new("/nope/missing.jpg"), 160).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }
}
