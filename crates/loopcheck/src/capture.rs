//! Photo capture sources.
//!
//! The session tracker never talks to a camera directly. It asks a
//! [`PhotoCapture`] implementation for an image and receives either a
//! [`PhotoPayload`] or a [`CaptureError`]. Capture failures are always
//! recoverable: the caller reports them and the user may try again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::photo::{PhotoKey, PhotoPayload};

/// Reasons a capture can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user or the OS refused access to the source.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No camera or image source is available.
    #[error("no image source available: {0}")]
    DeviceUnavailable(String),

    /// The source exists but cannot produce an image yet.
    #[error("capture not ready: {0}")]
    NotReady(String),

    /// The user backed out of the capture.
    #[error("capture cancelled")]
    Cancelled,

    /// The capture did not finish in time.
    #[error("capture timed out after {secs}s")]
    Timeout {
        /// The timeout that elapsed.
        secs: u64,
    },

    /// The produced file is not an accepted image type.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// The produced image exceeds the configured size cap.
    #[error("image is {size} bytes, larger than the {limit} byte limit")]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },
}

impl CaptureError {
    /// Short user-facing message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied(_) => {
                "Unable to access the camera. Check permissions and try again.".to_string()
            }
            Self::Cancelled => "Photo capture cancelled.".to_string(),
            other => format!("Photo capture failed: {other}"),
        }
    }
}

/// What the tracker is asking a source to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// The photo slot being filled.
    pub key: PhotoKey,
}

/// A source of photos (camera stream, file picker, test double).
#[async_trait::async_trait]
pub trait PhotoCapture: Send + Sync {
    /// The name of this source, for logging.
    fn name(&self) -> &'static str;

    /// Produce an image for `request`.
    ///
    /// Suspends until the image is available or the capture fails.
    ///
    /// # Errors
    ///
    /// Returns a [`CaptureError`] when permission is denied, no source is
    /// available, the user cancels, or the image is rejected.
    async fn capture(&self, request: CaptureRequest) -> Result<PhotoPayload, CaptureError>;
}

/// Run `source.capture` bounded by `timeout`.
///
/// # Errors
///
/// Returns the source's error, or [`CaptureError::Timeout`].
pub async fn capture_with_timeout(
    source: &dyn PhotoCapture,
    request: CaptureRequest,
    timeout: Duration,
) -> Result<PhotoPayload, CaptureError> {
    debug!(source = source.name(), key = %request.key, "requesting photo");
    match tokio::time::timeout(timeout, source.capture(request)).await {
        Ok(result) => result,
        Err(_) => Err(CaptureError::Timeout {
            secs: timeout.as_secs(),
        }),
    }
}

/// Detect an image media type from magic bytes.
#[must_use]
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        _ => None,
    }
}

/// File-picker capture: reads an image file from disk.
#[derive(Debug, Clone)]
pub struct FileCapture {
    path: PathBuf,
    accepted_types: Vec<String>,
    max_bytes: u64,
}

impl FileCapture {
    /// Create a source that reads `path`.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, accepted_types: Vec<String>, max_bytes: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            accepted_types,
            max_bytes,
        }
    }

    fn map_io(&self, err: &std::io::Error) -> CaptureError {
        let what = format!("{}: {err}", self.path.display());
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied(what),
            std::io::ErrorKind::NotFound => CaptureError::DeviceUnavailable(what),
            _ => CaptureError::NotReady(what),
        }
    }
}

#[async_trait::async_trait]
impl PhotoCapture for FileCapture {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn capture(&self, request: CaptureRequest) -> Result<PhotoPayload, CaptureError> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| self.map_io(&e))?;
        if !meta.is_file() {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} is not a file",
                self.path.display()
            )));
        }
        if meta.len() > self.max_bytes {
            return Err(CaptureError::TooLarge {
                size: meta.len(),
                limit: self.max_bytes,
            });
        }

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.map_io(&e))?;
        let mime = sniff_image_type(&bytes).ok_or_else(|| {
            CaptureError::UnsupportedFormat(format!("{} is not an image", self.path.display()))
        })?;
        if !self.accepted_types.iter().any(|t| t == mime) {
            return Err(CaptureError::UnsupportedFormat(mime.to_string()));
        }

        debug!(key = %request.key, mime, bytes = bytes.len(), "read photo from file");
        Ok(PhotoPayload::from_bytes(mime, &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::Phase;

    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn request() -> CaptureRequest {
        CaptureRequest {
            key: PhotoKey::new(0, Phase::Before),
        }
    }

    fn jpeg_only() -> Vec<String> {
        vec!["image/jpeg".to_string()]
    }

    #[test]
    fn test_sniff_image_type() {
        assert_eq!(sniff_image_type(JPEG_HEADER), Some("image/jpeg"));
        assert_eq!(
            sniff_image_type(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some("image/png")
        );
        assert_eq!(sniff_image_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"hello"), None);
        assert_eq!(sniff_image_type(&[]), None);
    }

    #[test]
    fn test_user_message() {
        let denied = CaptureError::PermissionDenied("blocked".to_string());
        assert!(denied.user_message().contains("camera"));
        let timeout = CaptureError::Timeout { secs: 30 };
        assert!(timeout.user_message().contains("30s"));
    }

    #[tokio::test]
    async fn test_file_capture_reads_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, JPEG_HEADER).unwrap();

        let source = FileCapture::new(&path, jpeg_only(), 1024);
        let payload = source.capture(request()).await.unwrap();
        assert_eq!(payload.mime(), "image/jpeg");
        assert_eq!(payload.decode().unwrap(), JPEG_HEADER);
    }

    #[tokio::test]
    async fn test_file_capture_missing_file() {
        let source = FileCapture::new("/nonexistent/photo.jpg", jpeg_only(), 1024);
        let err = source.capture(request()).await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_file_capture_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "just text").unwrap();

        let source = FileCapture::new(&path, jpeg_only(), 1024);
        let err = source.capture(request()).await.unwrap_err();
        assert!(matches!(err, CaptureError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_file_capture_rejects_unaccepted_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]).unwrap();

        let source = FileCapture::new(&path, jpeg_only(), 1024);
        let err = source.capture(request()).await.unwrap_err();
        assert_eq!(err, CaptureError::UnsupportedFormat("image/png".to_string()));
    }

    #[tokio::test]
    async fn test_file_capture_enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, JPEG_HEADER).unwrap();

        let source = FileCapture::new(&path, jpeg_only(), 4);
        let err = source.capture(request()).await.unwrap_err();
        assert!(matches!(err, CaptureError::TooLarge { size: 10, limit: 4 }));
    }

    struct NeverReady;

    #[async_trait::async_trait]
    impl PhotoCapture for NeverReady {
        fn name(&self) -> &'static str {
            "never"
        }

        async fn capture(&self, _request: CaptureRequest) -> Result<PhotoPayload, CaptureError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_with_timeout_expires() {
        let err = capture_with_timeout(&NeverReady, request(), Duration::from_secs(30))
            .await
            .unwrap_err();
        assert_eq!(err, CaptureError::Timeout { secs: 30 });
    }
}
