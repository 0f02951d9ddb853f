//! Remote key layout.
//!
//! Everything that knows how a capture date turns into bucket keys lives
//! here, so the pipeline, the updater, and the tests all agree on it:
//!
//! ```text
//! index.html, years.json                          site root
//! <year>/index.html, <year>/dates.json            one page per year
//! <year>/<year>-<month>-<day>/index.html          one page per day
//! <year>/<year>-<month>-<day>/photos.json
//! <year>/<year>-<month>-<day>/<file>              originals and thumbnails
//! ```

use std::path::PathBuf;
use time::Date;
use time::macros::format_description;

/// Per-day file listing document.
pub const FOLDER_MANIFEST: &str = "photos.json";
/// Per-year date listing document.
pub const YEAR_MANIFEST: &str = "dates.json";
/// Site-wide year listing document.
pub const YEARS_MANIFEST: &str = "years.json";
/// Gallery page name at every level.
pub const INDEX_PAGE: &str = "index.html";

const THUMB_SUFFIX: &str = "_thumb.jpg";

/// `2021` for 2021-03-05.
pub fn year(date: Date) -> String {
    date.year().to_string()
}

/// `2021-03-05`.
pub fn day(date: Date) -> String {
    // Infallible: the description only uses date components.
    date.format(format_description!("[year]-[month]-[day]")).unwrap()
}

/// `2021/2021-03-05`, the folder one day's uploads land in.
pub fn day_prefix(date: Date) -> PathBuf {
    PathBuf::from(format!("{}/{}", year(date), day(date)))
}

/// Key for an uploaded file within its day folder.
pub fn object_key(date: Date, file_name: &str) -> PathBuf {
    day_prefix(date).join(file_name)
}

pub fn folder_manifest_key(date: Date) -> PathBuf {
    day_prefix(date).join(FOLDER_MANIFEST)
}

pub fn folder_index_key(date: Date) -> PathBuf {
    day_prefix(date).join(INDEX_PAGE)
}

pub fn year_manifest_key(year: &str) -> PathBuf {
    PathBuf::from(year).join(YEAR_MANIFEST)
}

pub fn year_index_key(year: &str) -> PathBuf {
    PathBuf::from(year).join(INDEX_PAGE)
}

pub fn years_manifest_key() -> PathBuf {
    PathBuf::from(YEARS_MANIFEST)
}

pub fn root_index_key() -> PathBuf {
    PathBuf::from(INDEX_PAGE)
}

/// Whether an object name is a generated thumbnail.
pub fn is_thumb(name: &str) -> bool {
    name.ends_with(THUMB_SUFFIX)
}
