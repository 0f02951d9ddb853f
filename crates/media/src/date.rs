//! Capture-date resolution.
//!
//! A file's capture date decides which gallery folder it lands in, so this
//! chain is deliberately infallible: EXIF metadata when a photo has it,
//! then a date baked into the file name, then filesystem modification time,
//! and finally a fixed sentinel when even `stat` fails.

use crate::kind::MediaKind;
use exif::{Field, In, Tag, Value};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

/// Fallback date for files whose timestamps cannot be read at all.
pub const SENTINEL_DATE: Date = time::macros::date!(2000 - 01 - 01);

/// Matches names like `20160513_181656.mp4`.
static DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    // Infallible: pattern is a literal.
    Regex::new(r"^(\d{8})_").unwrap()
});

/// Resolve the capture date for a file.
///
/// Photos try their embedded EXIF timestamp first; videos and everything
/// else go straight to the modification-time path. Never errors, since any
/// file must still be bucketable.
pub fn capture_date(path: &Path, kind: MediaKind) -> Date {
    if kind == MediaKind::Photo
        && let Some(date) = exif_date(path)
    {
        return date;
    }
    fallback_date(path)
}

/// Capture timestamp from embedded EXIF metadata, if the file has any.
///
/// `DateTimeOriginal` is the shot timestamp; plain `DateTime` is a
/// last-resort stand-in some cameras write instead.
fn exif_date(path: &Path) -> Option<Date> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif
        .get_field(Tag::DateTimeOriginal, In::PRIMARY)
        .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))?;
    let raw = ascii_field(field)?;
    let parsed = exif::DateTime::from_ascii(raw.as_bytes()).ok()?;
    to_date(&parsed)
}

fn ascii_field(field: &Field) -> Option<&str> {
    if let Value::Ascii(text) = &field.value
        && text.len() == 1
    {
        return std::str::from_utf8(&text[0]).ok();
    }
    None
}

fn to_date(dt: &exif::DateTime) -> Option<Date> {
    let month = Month::try_from(dt.month).ok()?;
    Date::from_calendar_date(i32::from(dt.year), month, dt.day).ok()
}

/// The modification-time path: filename-date override, then fs mtime, then
/// the sentinel.
fn fallback_date(path: &Path) -> Date {
    // A re-encoded camera movie carries the transcode's mtime, but keeps
    // its shot date in the name. The name wins.
    if let Some(date) = filename_date(path) {
        return date;
    }
    match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => OffsetDateTime::from(modified).date(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unable to read modification time; using sentinel date");
            SENTINEL_DATE
        },
    }
}

/// Date parsed from an 8-digit-prefixed file name, when the digits form a
/// real calendar date.
fn filename_date(path: &Path) -> Option<Date> {
    let name = path.file_name()?.to_str()?;
    let digits = DATE_PREFIX.captures(name)?.get(1)?.as_str();
    Date::parse(digits, format_description!("[year][month][day]")).ok()
}
