//! Gallery manifest documents.
//!
//! Three JSON documents drive the static pages: a per-day file listing, a
//! per-year date listing (each date with a representative thumbnail), and
//! the site-wide year listing. The day listing is a full snapshot rebuilt
//! from the folder contents every time; the other two are append-if-absent
//! so repeated runs never duplicate entries.

use crate::layout::{FOLDER_MANIFEST, INDEX_PAGE, is_thumb};
use serde::{Deserialize, Serialize};

/// Per-day file listing (`photos.json`).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderManifest {
    pub files: Vec<String>,
}

impl FolderManifest {
    /// Build from a day folder's object names: everything that isn't the
    /// page, the manifest itself, or a generated thumbnail. Sorted and
    /// de-duplicated.
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let mut files: Vec<String> =
            names.into_iter().filter(|name| name != INDEX_PAGE && name != FOLDER_MANIFEST && !is_thumb(name)).collect();
        files.sort();
        files.dedup();
        Self { files }
    }
}

/// One day's entry on a year page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Thumbnail path relative to the year folder, or an absolute icon URL
    pub thumb: String,
}

/// Per-year date listing (`dates.json`).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearManifest {
    pub dates: Vec<DateEntry>,
}

impl YearManifest {
    /// Add a date unless it is already listed. Returns whether anything
    /// changed. Dates stay sorted ascending by their string form.
    pub fn insert(&mut self, date: impl Into<String>, thumb: impl Into<String>) -> bool {
        let date = date.into();
        if self.dates.iter().any(|entry| entry.date == date) {
            return false;
        }
        self.dates.push(DateEntry { date, thumb: thumb.into() });
        self.dates.sort_by(|a, b| a.date.cmp(&b.date));
        true
    }
}

/// Site-wide year listing (`years.json`).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearsManifest {
    pub years: Vec<String>,
}

impl YearsManifest {
    /// Add a year unless it is already listed. Returns whether anything
    /// changed. Years stay sorted ascending.
    pub fn insert(&mut self, year: impl Into<String>) -> bool {
        let year = year.into();
        if self.years.contains(&year) {
            return false;
        }
        self.years.push(year);
        self.years.sort();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_manifest_excludes_artifacts() {
        let manifest = FolderManifest::from_names(
            [
                "photo1.jpg",
                "photo1_thumb.jpg",
                "clip1.mp4",
                "clip1_thumb.jpg",
                "index.html",
                "photos.json",
            ]
            .map(String::from),
        );
        assert_eq!(manifest.files, vec!["clip1.mp4", "photo1.jpg"]);
    }

    #[test]
    fn test_folder_manifest_sorts_and_dedupes() {
        let manifest = FolderManifest::from_names(["b.jpg", "a.jpg", "b.jpg"].map(String::from));
        assert_eq!(manifest.files, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_year_manifest_insert_is_idempotent() {
        let mut manifest = YearManifest::default();
        assert!(manifest.insert("2021-03-05", "2021-03-05/a_thumb.jpg"));
        assert!(!manifest.insert("2021-03-05", "2021-03-05/other_thumb.jpg"));
        assert_eq!(manifest.dates.len(), 1);
        // The first thumbnail sticks.
        assert_eq!(manifest.dates[0].thumb, "2021-03-05/a_thumb.jpg");
    }

    #[test]
    fn test_year_manifest_sorted_by_date_string() {
        let mut manifest = YearManifest::default();
        manifest.insert("2021-11-02", "t1");
        manifest.insert("2021-03-05", "t2");
        manifest.insert("2021-07-19", "t3");
        let dates: Vec<_> = manifest.dates.iter().map(|entry| entry.date.as_str()).collect();
        assert_eq!(dates, vec!["2021-03-05", "2021-07-19", "2021-11-02"]);
    }

    #[test]
    fn test_years_manifest_insert() {
        let mut manifest = YearsManifest::default();
        assert!(manifest.insert("2022"));
        assert!(manifest.insert("2019"));
        assert!(!manifest.insert("2022"));
        assert_eq!(manifest.years, vec!["2019", "2022"]);
    }

    #[test]
    fn test_wire_format() {
        let mut manifest = YearManifest::default();
        manifest.insert("2021-03-05", "2021-03-05/photo1_thumb.jpg");
        let json = serde_json::to_string(&manifest).unwrap();
        assert_eq!(json, r#"{"dates":[{"date":"2021-03-05","thumb":"2021-03-05/photo1_thumb.jpg"}]}"#);
    }
}
