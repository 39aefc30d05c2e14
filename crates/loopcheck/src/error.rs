//! Error types for loopcheck.
//!
//! This module defines the crate-wide error type. Capture and storage failures
//! have their own enums (see [`crate::capture::CaptureError`] and
//! [`crate::storage::StorageError`]); callers recover from those in place and
//! they never become an [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for loopcheck operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Checklist Errors ===
    /// A loop task index outside the catalog.
    #[error("task index {index} is out of range (loop has {task_count} tasks)")]
    InvalidTaskIndex {
        /// The rejected index.
        index: usize,
        /// Number of tasks in the loop catalog.
        task_count: usize,
    },

    /// A daily task id that is not in the daily catalog.
    #[error("unknown daily task id {id}")]
    UnknownDailyTask {
        /// The rejected id.
        id: u32,
    },

    /// A photo key that does not parse as `<taskIndex>-<phase>`.
    #[error("invalid photo key '{key}'")]
    InvalidPhotoKey {
        /// The rejected key.
        key: String,
    },

    /// A photo payload that is not a base64 image data URL.
    #[error("invalid photo payload: {reason}")]
    InvalidPhotoPayload {
        /// Why the payload was rejected.
        reason: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for loopcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an out-of-range task index error.
    #[must_use]
    pub fn invalid_task_index(index: usize, task_count: usize) -> Self {
        Self::InvalidTaskIndex { index, task_count }
    }

    /// Create an invalid photo payload error.
    #[must_use]
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPhotoPayload {
            reason: reason.into(),
        }
    }

    /// Check if this error was caused by a bad caller-supplied argument.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidTaskIndex { .. }
                | Self::UnknownDailyTask { .. }
                | Self::InvalidPhotoKey { .. }
                | Self::InvalidPhotoPayload { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_task_index_display() {
        let err = Error::invalid_task_index(9, 8);
        assert_eq!(
            err.to_string(),
            "task index 9 is out of range (loop has 8 tasks)"
        );
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_unknown_daily_task_display() {
        let err = Error::UnknownDailyTask { id: 99 };
        assert!(err.to_string().contains("99"));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "session.event_buffer must be greater than 0".to_string(),
        };
        assert!(err.to_string().contains("event_buffer"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }

    #[test]
    fn test_invalid_payload_display() {
        let err = Error::invalid_payload("missing data: prefix");
        assert_eq!(
            err.to_string(),
            "invalid photo payload: missing data: prefix"
        );
    }
}
