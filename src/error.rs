//! Error types for the sidecar synchronization engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the engine.
///
/// Only [`Error::UnsupportedFileType`] is treated as a benign outcome by the
/// driver; every other variant aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode sidecar: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported file type {file_type:?}")]
    UnsupportedFileType { file_type: String },

    #[error("Failed to parse JPEG {path}: {message}")]
    Jpeg { path: PathBuf, message: String },

    #[error("No EXIF segment in {path}")]
    MissingExif { path: PathBuf },

    #[error("Malformed EXIF in {path}: {message}")]
    MalformedExif { path: PathBuf, message: String },

    #[error("Failed to write EXIF to {path}: {message}")]
    ExifWrite { path: PathBuf, message: String },

    #[error("Invalid {axis} coordinate: {value}")]
    InvalidCoordinate { axis: &'static str, value: f64 },

    #[error("Invalid epoch timestamp {value:?}: {message}")]
    InvalidTimestamp { value: String, message: String },

    #[error("Failed to remove sidecar {path}: {source}")]
    RemoveSidecar {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl Error {
    /// Whether this error is the skippable "not a JPEG" condition.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedFileType { .. })
    }

    /// Build the unsupported-type error from an image path, keeping the
    /// extension with its leading dot (empty when there is none).
    pub fn unsupported(path: &std::path::Path) -> Self {
        let file_type = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Error::UnsupportedFileType { file_type }
    }
}
