//! Error types for capability access and analysis passes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by handle operations and analysis passes.
///
/// Paths are whatever the capability that raised the error knows about the entry.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The entry exists but the capability refuses the operation on it.
    #[error("Unsupported entry {path}: {reason}")]
    Unsupported { path: String, reason: String },

    /// Operation was cancelled.
    #[error("Operation interrupted")]
    Interrupted,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether the error means the entry no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Map this error onto the warning kind used for entry-level failures.
    pub fn warning_kind(&self) -> WarningKind {
        match self {
            Self::PermissionDenied { .. } => WarningKind::PermissionDenied,
            Self::NotFound { .. } => WarningKind::NotFound,
            Self::Unsupported { .. } => WarningKind::Unsupported,
            _ => WarningKind::ReadError,
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Entry disappeared between listing and access.
    NotFound,
    /// Error reading file content or directory children.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Entry kind the capability will not read (e.g. symbolic links).
    Unsupported,
}

/// Non-fatal warning encountered during a pass.
///
/// Files that end up in a report's `skipped` list are described by one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Root-relative path where the warning occurred.
    pub path: String,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<String>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from a capability error.
    pub fn from_error(path: impl Into<String>, error: &ScanError) -> Self {
        Self::new(path, error.to_string(), error.warning_kind())
    }

    /// Create a warning for a file whose metadata could not be read.
    pub fn metadata_error(path: impl Into<String>, error: &ScanError) -> Self {
        Self::new(path, format!("Metadata error: {error}"), WarningKind::MetadataError)
    }
}
