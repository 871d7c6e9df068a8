//! Error types for the organizer

use std::path::PathBuf;
use thiserror::Error;

/// Error kinds that can occur while processing a single item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeErrorKind {
    /// Permission denied when accessing a file or directory
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// I/O error during file operations
    Io,
    /// External process could not be started or exited non-zero
    Subprocess,
    /// Sidecar document is not valid JSON
    Json,
    /// Capture time missing or not in the expected format
    TimestampParse,
    /// Embedded image metadata could not be exported or imported
    Metadata,
    /// Path has no usable file name
    InvalidPath,
}

/// Represents a recoverable error for one media item
#[derive(Debug, Error)]
#[error("{kind:?}: {message} (path: {path:?})")]
pub struct OrganizeError {
    /// The kind of error
    pub kind: OrganizeErrorKind,
    /// The path where the error occurred
    pub path: Option<PathBuf>,
    /// Human-readable error message
    pub message: String,
}

impl OrganizeError {
    /// Create a new error
    pub fn new(kind: OrganizeErrorKind, path: Option<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path,
            message: message.into(),
        }
    }

    /// Create an I/O error tied to a path, keeping the NotFound/PermissionDenied distinction
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let mut error = Self::from(err);
        error.path = Some(path.into());
        error
    }

    /// Create a subprocess error
    pub fn subprocess(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(OrganizeErrorKind::Subprocess, Some(path.into()), message)
    }

    /// Create a timestamp parse error
    pub fn timestamp(message: impl Into<String>) -> Self {
        Self::new(OrganizeErrorKind::TimestampParse, None, message)
    }

    /// Create an image metadata error
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(OrganizeErrorKind::Metadata, Some(path.into()), message)
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::new(OrganizeErrorKind::InvalidPath, Some(path.into()), message)
    }

    /// Attach a path if none is set yet
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        if self.path.is_none() {
            self.path = Some(path.into());
        }
        self
    }
}

impl From<std::io::Error> for OrganizeError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => OrganizeErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => OrganizeErrorKind::NotFound,
            _ => OrganizeErrorKind::Io,
        };
        Self::new(kind, None, err.to_string())
    }
}

impl From<serde_json::Error> for OrganizeError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(OrganizeErrorKind::Json, None, err.to_string())
    }
}

/// Pre-flight errors that abort the whole run
#[derive(Debug, Error)]
pub enum FatalError {
    /// A required command line argument is missing or blank
    #[error("invalid {0} argument")]
    MissingArgument(&'static str),
    /// The input path cannot be turned into an absolute path
    #[error("invalid input folder path {path:?}: {message}")]
    UnresolvableInput { path: PathBuf, message: String },
    /// The input folder does not exist or is not a directory
    #[error("input folder does not exist: {0:?}")]
    InputMissing(PathBuf),
    /// The output path cannot be turned into an absolute path
    #[error("invalid output folder path {path:?}: {message}")]
    InvalidOutput { path: PathBuf, message: String },
    /// The output folder could not be created
    #[error("failed to create output folder {path:?}: {source}")]
    OutputNotCreated {
        path: PathBuf,
        #[source]
        source: OrganizeError,
    },
}

impl FatalError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            FatalError::MissingArgument(_) => 1,
            FatalError::UnresolvableInput { .. } => 2,
            FatalError::InputMissing(_) | FatalError::InvalidOutput { .. } => 3,
            FatalError::OutputNotCreated { .. } => 4,
        }
    }
}
