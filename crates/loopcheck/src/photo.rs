//! Photo evidence types.
//!
//! Photos are stored as base64 data URLs keyed by loop task index and
//! before/after phase. The key's string form (`"3-before"`) is what gets
//! persisted and shown in the gallery.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Before/after designation for a task's paired photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Taken before the area is serviced.
    Before,
    /// Taken after the area is serviced.
    After,
}

impl Phase {
    /// Capitalized label used in listings.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Before => "Before",
            Self::After => "After",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}

impl FromStr for Phase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            _ => Err(Error::InvalidPhotoKey { key: s.to_string() }),
        }
    }
}

/// Identifies one photo slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhotoKey {
    /// Loop task index.
    pub task_index: usize,
    /// Before or after.
    pub phase: Phase,
}

impl PhotoKey {
    /// Create a key.
    #[must_use]
    pub fn new(task_index: usize, phase: Phase) -> Self {
        Self { task_index, phase }
    }
}

impl fmt::Display for PhotoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.task_index, self.phase)
    }
}

impl FromStr for PhotoKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidPhotoKey { key: s.to_string() };
        let (index, phase) = s.split_once('-').ok_or_else(invalid)?;
        let task_index = index.trim().parse().map_err(|_| invalid())?;
        let phase = phase.parse().map_err(|_| invalid())?;
        Ok(Self { task_index, phase })
    }
}

/// A validated `data:image/<type>;base64,<data>` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhotoPayload {
    url: String,
    data_offset: usize,
}

impl PhotoPayload {
    /// Validate a data URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPhotoPayload`] if the string is not a base64
    /// data URL with an `image/*` media type.
    pub fn parse(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| Error::invalid_payload("missing data: prefix"))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::invalid_payload("missing ',' separator"))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::invalid_payload("payload is not base64 encoded"))?;
        if !mime.starts_with("image/") {
            return Err(Error::invalid_payload(format!(
                "media type {mime} is not an image"
            )));
        }
        if data.is_empty() {
            return Err(Error::invalid_payload("empty image data"));
        }
        STANDARD
            .decode(data)
            .map_err(|e| Error::invalid_payload(format!("bad base64: {e}")))?;

        let data_offset = url.len() - data.len();
        Ok(Self { url, data_offset })
    }

    /// Encode raw image bytes as a data URL.
    #[must_use]
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let prefix = format!("data:{mime};base64,");
        let data_offset = prefix.len();
        Self {
            url: prefix + &STANDARD.encode(bytes),
            data_offset,
        }
    }

    /// The full data URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The media type, e.g. `image/jpeg`.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.url["data:".len()..self.data_offset - ";base64,".len()]
    }

    /// The base64 portion of the URL.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.url[self.data_offset..]
    }

    /// Decode the image bytes.
    ///
    /// # Errors
    ///
    /// Never fails for a payload built by [`PhotoPayload::parse`] or
    /// [`PhotoPayload::from_bytes`]; the `Result` covers deserialized input.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.data())
            .map_err(|e| Error::invalid_payload(format!("bad base64: {e}")))
    }

    /// Size of the decoded image, computed from the base64 length.
    #[must_use]
    pub fn decoded_len(&self) -> usize {
        let data = self.data().as_bytes();
        let padding = data.iter().rev().take_while(|&&b| b == b'=').count();
        (data.len() / 4 * 3).saturating_sub(padding)
    }

    /// BLAKE3 fingerprint of the data URL, for spotting identical retakes.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.url.as_bytes()).to_hex().to_string()
    }

    /// File extension matching the media type.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }
}

impl TryFrom<String> for PhotoPayload {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<PhotoPayload> for String {
    fn from(payload: PhotoPayload) -> Self {
        payload.url
    }
}

impl fmt::Display for PhotoPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Payloads run to megabytes; show the header only.
        write!(f, "data:{};base64,<{} bytes>", self.mime(), self.decoded_len())
    }
}

/// All photos of the current session, at most one per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoMap {
    photos: BTreeMap<PhotoKey, PhotoPayload>,
}

impl PhotoMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a photo, replacing any existing one at the key.
    ///
    /// Returns `true` if the key was newly added, `false` on a retake.
    pub fn insert(&mut self, key: PhotoKey, payload: PhotoPayload) -> bool {
        self.photos.insert(key, payload).is_none()
    }

    /// Look up a photo.
    #[must_use]
    pub fn get(&self, key: PhotoKey) -> Option<&PhotoPayload> {
        self.photos.get(&key)
    }

    /// Remove one photo, returning it if present.
    pub fn remove(&mut self, key: PhotoKey) -> Option<PhotoPayload> {
        self.photos.remove(&key)
    }

    /// Remove every photo.
    pub fn clear(&mut self) {
        self.photos.clear();
    }

    /// Number of stored photos.
    #[must_use]
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    /// Whether no photos are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// Whether both phases are present for a task.
    #[must_use]
    pub fn has_pair(&self, task_index: usize) -> bool {
        [Phase::Before, Phase::After]
            .into_iter()
            .all(|phase| self.photos.contains_key(&PhotoKey::new(task_index, phase)))
    }

    /// Iterate in key order.
    pub fn iter(&self) -> impl Iterator<Item = (PhotoKey, &PhotoPayload)> {
        self.photos.iter().map(|(k, v)| (*k, v))
    }

    /// Drop photos whose task index is outside `0..task_count`.
    ///
    /// Returns the number of photos removed.
    pub fn retain_tasks(&mut self, task_count: usize) -> usize {
        let before = self.photos.len();
        self.photos.retain(|key, _| key.task_index < task_count);
        before - self.photos.len()
    }

    /// Persisted form: `"<index>-<phase>"` → data URL.
    #[must_use]
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.photos
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_str().to_string()))
            .collect()
    }

    /// Rebuild from the persisted form, skipping malformed entries.
    ///
    /// Returns the map and the keys that were skipped.
    #[must_use]
    pub fn from_string_map(raw: BTreeMap<String, String>) -> (Self, Vec<String>) {
        let mut map = Self::new();
        let mut skipped = Vec::new();
        for (key, url) in raw {
            match (key.parse::<PhotoKey>(), PhotoPayload::parse(url)) {
                (Ok(k), Ok(p)) => {
                    map.insert(k, p);
                }
                _ => skipped.push(key),
            }
        }
        (map, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_key_display_and_parse() {
        let key = PhotoKey::new(3, Phase::Before);
        assert_eq!(key.to_string(), "3-before");
        assert_eq!("3-before".parse::<PhotoKey>().unwrap(), key);
        assert_eq!(
            "7-AFTER".parse::<PhotoKey>().unwrap(),
            PhotoKey::new(7, Phase::After)
        );
    }

    #[test]
    fn test_photo_key_rejects_garbage() {
        for bad in ["", "3", "x-before", "3-during", "-before"] {
            assert!(bad.parse::<PhotoKey>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_payload_parse_valid() {
        let payload = PhotoPayload::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(payload.mime(), "image/jpeg");
        assert_eq!(payload.data(), "AAAA");
        assert_eq!(payload.decoded_len(), 3);
        assert_eq!(payload.decode().unwrap(), vec![0, 0, 0]);
        assert_eq!(payload.extension(), "jpg");
    }

    #[test]
    fn test_payload_parse_rejects_non_images() {
        assert!(PhotoPayload::parse("AAAA").is_err());
        assert!(PhotoPayload::parse("data:text/plain;base64,AAAA").is_err());
        assert!(PhotoPayload::parse("data:image/png,AAAA").is_err());
        assert!(PhotoPayload::parse("data:image/png;base64,").is_err());
        assert!(PhotoPayload::parse("data:image/png;base64,@@@@").is_err());
    }

    #[test]
    fn test_payload_from_bytes() {
        let payload = PhotoPayload::from_bytes("image/png", &[1, 2, 3, 4, 5]);
        assert!(payload.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(payload.mime(), "image/png");
        assert_eq!(payload.decoded_len(), 5);
        assert_eq!(payload.decode().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_payload_display_hides_data() {
        let payload = PhotoPayload::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(payload.to_string(), "data:image/jpeg;base64,<3 bytes>");
    }

    #[test]
    fn test_retake_overwrites() {
        let mut map = PhotoMap::new();
        let key = PhotoKey::new(3, Phase::Before);
        assert!(map.insert(key, PhotoPayload::parse("data:image/jpeg;base64,AAAA").unwrap()));
        assert!(!map.insert(key, PhotoPayload::parse("data:image/jpeg;base64,BBBB").unwrap()));
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.get(key).map(PhotoPayload::as_str),
            Some("data:image/jpeg;base64,BBBB")
        );
    }

    #[test]
    fn test_has_pair() {
        let mut map = PhotoMap::new();
        let payload = PhotoPayload::parse("data:image/jpeg;base64,AAAA").unwrap();
        map.insert(PhotoKey::new(1, Phase::Before), payload.clone());
        assert!(!map.has_pair(1));
        map.insert(PhotoKey::new(1, Phase::After), payload);
        assert!(map.has_pair(1));
    }

    #[test]
    fn test_string_map_skips_malformed() {
        let raw: BTreeMap<String, String> = [
            ("0-before".to_string(), "data:image/jpeg;base64,AAAA".to_string()),
            ("0-sideways".to_string(), "data:image/jpeg;base64,AAAA".to_string()),
            ("1-after".to_string(), "not a url".to_string()),
        ]
        .into_iter()
        .collect();

        let (map, skipped) = PhotoMap::from_string_map(raw);
        assert_eq!(map.len(), 1);
        assert_eq!(skipped, vec!["0-sideways".to_string(), "1-after".to_string()]);
        assert_eq!(map.to_string_map().keys().collect::<Vec<_>>(), vec!["0-before"]);
    }

    #[test]
    fn test_retain_tasks() {
        let mut map = PhotoMap::new();
        let payload = PhotoPayload::parse("data:image/jpeg;base64,AAAA").unwrap();
        map.insert(PhotoKey::new(2, Phase::Before), payload.clone());
        map.insert(PhotoKey::new(12, Phase::After), payload);
        assert_eq!(map.retain_tasks(8), 1);
        assert_eq!(map.len(), 1);
    }
}
