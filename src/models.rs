//! Core data models for the organizer

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::OrganizerConfig;

/// A media file together with the sidecar JSON that describes it
///
/// Live-photo companions carry the sidecar of their primary photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaSidecarPair {
    media_path: PathBuf,
    sidecar_path: PathBuf,
}

impl MediaSidecarPair {
    /// Create a new pair
    pub fn new(media_path: impl Into<PathBuf>, sidecar_path: impl Into<PathBuf>) -> Self {
        Self {
            media_path: media_path.into(),
            sidecar_path: sidecar_path.into(),
        }
    }

    /// Path of the media file
    pub fn media_path(&self) -> &Path {
        &self.media_path
    }

    /// Path of the sidecar JSON
    pub fn sidecar_path(&self) -> &Path {
        &self.sidecar_path
    }
}

/// Image formats supported by the metadata round trip
///
/// This is the single list of extensions the image strategy handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    /// Infer the image kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            _ => None,
        }
    }

    /// Infer the image kind from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Copy strategy selected for a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Handed to the transcoder
    Video,
    /// Resized with an embedded metadata round trip
    Image(ImageKind),
    /// Copied byte for byte
    Other,
}

impl MediaKind {
    /// Classify a file extension, case-insensitively
    pub fn from_extension(ext: &str) -> Self {
        if OrganizerConfig::is_video_extension(ext) {
            return MediaKind::Video;
        }
        match ImageKind::from_extension(ext) {
            Some(kind) => MediaKind::Image(kind),
            None => MediaKind::Other,
        }
    }

    /// Classify a path by its extension
    pub fn classify(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(MediaKind::Other)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image(_) => "image",
            MediaKind::Other => "other",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened to one discovered pair
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    /// The processed pair
    pub pair: MediaSidecarPair,
    /// Output file, when the copy step succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Capture instant written to the output's modification time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamped_time: Option<DateTime<Utc>>,
    /// Error message for a failed copy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    /// A successful copy
    pub fn copied(pair: MediaSidecarPair, output_path: PathBuf) -> Self {
        Self {
            pair,
            output_path: Some(output_path),
            stamped_time: None,
            error: None,
        }
    }

    /// A failed copy
    pub fn failed(pair: MediaSidecarPair, error: impl Into<String>) -> Self {
        Self {
            pair,
            output_path: None,
            stamped_time: None,
            error: Some(error.into()),
        }
    }

    /// Record the stamped capture time
    pub fn with_stamped_time(mut self, instant: DateTime<Utc>) -> Self {
        self.stamped_time = Some(instant);
        self
    }

    /// Whether the copy step succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of a whole run, in processing order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// One entry per discovered pair
    pub items: Vec<ItemOutcome>,
    /// Total run duration in milliseconds
    pub duration_ms: u64,
}

impl RunReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items whose copy failed
    pub fn failure_count(&self) -> usize {
        self.items.iter().filter(|i| !i.is_success()).count()
    }

    /// Find the outcome for a media path
    pub fn outcome_for(&self, media_path: &Path) -> Option<&ItemOutcome> {
        self.items.iter().find(|i| i.pair.media_path() == media_path)
    }
}
