//! Manifest and page regeneration.
//!
//! Called once per date bucket after all of the bucket's uploads have
//! landed. The day folder's listing is rebuilt as a full snapshot; the
//! year and site-root documents are append-if-absent, so re-running a
//! batch never duplicates entries. There is no locking: the pipeline
//! processes one bucket at a time and is the only writer.

use crate::error::{ErrorKind, Result};
use crate::layout;
use crate::manifest::{FolderManifest, YearManifest, YearsManifest};
use crate::pages::Pages;
use exn::ResultExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shoebox_storage::BackendHandle;
use shoebox_storage::error::ErrorKind as StorageErrorKind;
use std::path::Path;
use time::Date;

/// Shown on a year page for a day that somehow has no thumbnails (for
/// example a day of videos processed without ffmpeg available).
const FALLBACK_ICON: &str = "https://findicons.com/files/icons/2221/folder/128/normal_folder.png";

/// Rebuild one day folder's manifest and page, then roll the day up into
/// the year and site-root documents.
pub async fn update_folder(backend: &BackendHandle, pages: &Pages, date: Date) -> Result<()> {
    let prefix = layout::day_prefix(date);
    let listing = backend.list(Some(&prefix)).await.or_raise(|| ErrorKind::Storage)?;
    let mut names: Vec<String> = listing.iter().map(|info| info.base_name().to_string()).collect();
    // Backends list in lexicographic order already; sorting again costs
    // nothing and pins the thumbnail pick below to a deterministic winner.
    names.sort();

    let manifest = FolderManifest::from_names(names.iter().cloned());
    write_json(backend, &layout::folder_manifest_key(date), &manifest).await?;
    tracing::info!(folder = %prefix.display(), files = manifest.files.len(), "Updated folder manifest");

    let page = pages.day(date)?;
    backend.write(&layout::folder_index_key(date), page.as_bytes()).await.or_raise(|| ErrorKind::Storage)?;

    // Representative thumbnail for the year page: first thumbnail in sorted
    // order, or a generic folder icon when the day has none.
    let thumb = names
        .iter()
        .find(|name| layout::is_thumb(name))
        .map(|name| format!("{}/{name}", layout::day(date)))
        .unwrap_or_else(|| FALLBACK_ICON.to_string());

    update_year(backend, pages, date, &thumb).await?;
    update_years(backend, pages, date).await?;
    Ok(())
}

/// Add a day to its year's `dates.json` and regenerate the year page.
/// No-op if the date is already listed.
pub async fn update_year(backend: &BackendHandle, pages: &Pages, date: Date, thumb: &str) -> Result<()> {
    let year = layout::year(date);
    let key = layout::year_manifest_key(&year);
    let mut manifest: YearManifest = fetch_manifest(backend, &key).await?;
    if !manifest.insert(layout::day(date), thumb) {
        tracing::debug!(year = %year, date = %layout::day(date), "Year manifest already lists this date");
        return Ok(());
    }
    write_json(backend, &key, &manifest).await?;
    let page = pages.year(&year)?;
    backend.write(&layout::year_index_key(&year), page.as_bytes()).await.or_raise(|| ErrorKind::Storage)?;
    tracing::info!(year = %year, date = %layout::day(date), "Added date to year manifest");
    Ok(())
}

/// Add a year to the site-wide `years.json` and regenerate the root page.
/// No-op if the year is already listed.
pub async fn update_years(backend: &BackendHandle, pages: &Pages, date: Date) -> Result<()> {
    let year = layout::year(date);
    let key = layout::years_manifest_key();
    let mut manifest: YearsManifest = fetch_manifest(backend, &key).await?;
    if !manifest.insert(&year) {
        return Ok(());
    }
    write_json(backend, &key, &manifest).await?;
    let page = pages.root()?;
    backend.write(&layout::root_index_key(), page.as_bytes()).await.or_raise(|| ErrorKind::Storage)?;
    tracing::info!(year = %year, "Added year to site manifest");
    Ok(())
}

/// Fetch a manifest, distinguishing "absent" (normal, start from empty)
/// from "present but malformed" (fail loudly).
async fn fetch_manifest<T: DeserializeOwned + Default>(backend: &BackendHandle, key: &Path) -> Result<T> {
    let raw = match backend.read(key).await {
        Ok(raw) => raw,
        Err(e) if matches!(&*e, StorageErrorKind::NotFound(_)) => return Ok(T::default()),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Storage),
    };
    serde_json::from_slice(&raw).or_raise(|| ErrorKind::CorruptManifest(key.to_path_buf()))
}

async fn write_json<T: Serialize>(backend: &BackendHandle, key: &Path, document: &T) -> Result<()> {
    let json = serde_json::to_vec(document).or_raise(|| ErrorKind::Serialize)?;
    backend.write(key, &json).await.or_raise(|| ErrorKind::Storage)
}
