//! Error types for pyp
//!
//! All modules use `LauncherResult<T>` as their return type. Failures that
//! the launch pipeline tolerates (side-file copies, individual dependency
//! packages, script execution) are recorded in reports instead and never
//! surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for launcher operations
pub type LauncherResult<T> = Result<T, LauncherError>;

/// All errors that can occur in pyp
#[derive(Error, Debug)]
pub enum LauncherError {
    // Selection errors
    #[error("No file selected.")]
    SelectionCancelled,

    #[error("Interrupted.")]
    Interrupted,

    #[error("Not a .pyp file: {0}")]
    NotAPackage(PathBuf),

    // Package errors
    #[error("Invalid package archive {path}: {source}")]
    ArchiveFormat {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{name} not found in root of package {package}")]
    MissingEntry { name: String, package: PathBuf },

    // Cache errors
    #[error("Unknown digest algorithm: {0}")]
    UnknownDigest(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("{0}")]
    User(String),
}

impl LauncherError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an archive format error for the given package path
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::ArchiveFormat {
            path: path.into(),
            source,
        }
    }

    /// Whether the error is a clean, silent termination rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::SelectionCancelled)
    }

    /// Whether the user interrupted the launch
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingEntry { .. } => {
                Some("A .pyp package must contain script.py at the archive root")
            }
            Self::ArchiveFormat { .. } => Some("A .pyp package is a zip archive; rebuild it with zip"),
            Self::UnknownDigest(_) => Some("Supported values for cache.digest: md5, sha256"),
            Self::NotAPackage(_) => Some("Pick a file ending in .pyp"),
            _ => None,
        }
    }
}
