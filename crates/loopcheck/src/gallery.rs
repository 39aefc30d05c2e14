//! Read-only photo gallery over the current loop's photos.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::catalog;
use crate::error::{Error, Result};
use crate::photo::{Phase, PhotoKey, PhotoMap, PhotoPayload};

/// Display data for one photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoMetadata {
    /// `"<taskIndex>-<phase>"`.
    pub id: String,
    /// Suggested file name for downloads.
    pub filename: String,
    /// Approximate size in KB, estimated from the data URL length.
    pub size_kb: u64,
    /// Area the photo was taken in.
    pub location: &'static str,
    /// `Before` or `After`.
    pub label: &'static str,
    /// Loop task index.
    pub task_index: usize,
    /// Before or after.
    pub phase: Phase,
    /// Media type.
    pub mime: String,
    /// BLAKE3 fingerprint of the payload.
    pub fingerprint: String,
}

/// Totals shown above the gallery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GallerySummary {
    /// Number of photos.
    pub total_photos: usize,
    /// Sum of the per-photo KB estimates.
    pub total_size_kb: u64,
    /// Photos taken before servicing.
    pub before: usize,
    /// Photos taken after servicing.
    pub after: usize,
    /// Tasks with both a before and an after photo.
    pub complete_pairs: usize,
}

/// Estimate of the image size behind a data URL, in KB.
///
/// Matches what the gallery has always shown: three quarters of the URL
/// length, rounded to whole KB.
#[must_use]
pub fn approx_size_kb(payload: &PhotoPayload) -> u64 {
    let len = payload.as_str().len() as u64;
    let bytes = (len * 3 + 2) / 4;
    (bytes + 512) / 1024
}

/// Download file name for a photo.
#[must_use]
pub fn filename(key: PhotoKey, payload: &PhotoPayload, taken_at: DateTime<Utc>) -> String {
    format!(
        "Photo_{}_{key}.{}",
        taken_at.timestamp_millis(),
        payload.extension()
    )
}

/// Metadata for every photo, in key order.
#[must_use]
pub fn list(photos: &PhotoMap, taken_at: DateTime<Utc>) -> Vec<PhotoMetadata> {
    photos
        .iter()
        .map(|(key, payload)| PhotoMetadata {
            id: key.to_string(),
            filename: filename(key, payload, taken_at),
            size_kb: approx_size_kb(payload),
            location: catalog::loop_task(key.task_index).map_or("Unknown Location", |t| t.area),
            label: key.phase.label(),
            task_index: key.task_index,
            phase: key.phase,
            mime: payload.mime().to_string(),
            fingerprint: payload.fingerprint(),
        })
        .collect()
}

/// Gallery totals.
#[must_use]
pub fn summarize(photos: &PhotoMap) -> GallerySummary {
    let mut summary = GallerySummary::default();
    let mut paired = std::collections::BTreeSet::new();
    for (key, payload) in photos.iter() {
        summary.total_photos += 1;
        summary.total_size_kb += approx_size_kb(payload);
        match key.phase {
            Phase::Before => summary.before += 1,
            Phase::After => summary.after += 1,
        }
        if photos.has_pair(key.task_index) {
            paired.insert(key.task_index);
        }
    }
    summary.complete_pairs = paired.len();
    summary
}

/// Parse gallery ids such as `"3-before"`.
///
/// # Errors
///
/// Returns [`Error::InvalidPhotoKey`] for the first id that does not parse.
pub fn parse_keys<S: AsRef<str>>(ids: &[S]) -> Result<Vec<PhotoKey>> {
    ids.iter().map(|id| id.as_ref().parse()).collect()
}

/// Decode photos into image files under `dir`.
///
/// Exports `keys`, or every photo when `keys` is empty. Keys with no photo
/// are skipped with a warning. Returns the written paths.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, a payload does not
/// decode, or a file cannot be written.
pub async fn export(
    photos: &PhotoMap,
    keys: &[PhotoKey],
    dir: &Path,
    taken_at: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| Error::DirectoryCreate {
            path: dir.to_path_buf(),
            source,
        })?;

    let selected: Vec<PhotoKey> = if keys.is_empty() {
        photos.iter().map(|(key, _)| key).collect()
    } else {
        keys.to_vec()
    };

    let mut written = Vec::with_capacity(selected.len());
    for key in selected {
        let Some(payload) = photos.get(key) else {
            warn!(%key, "no photo to export");
            continue;
        };
        let path = dir.join(filename(key, payload, taken_at));
        tokio::fs::write(&path, payload.decode()?).await?;
        debug!(%key, path = %path.display(), "exported photo");
        written.push(path);
    }
    Ok(written)
}
