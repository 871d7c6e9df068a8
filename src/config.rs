//! Configuration for the organizer

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Default constraint passed to the resizer, in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 1920;

/// Default transcoder executable
pub const DEFAULT_TRANSCODER: &str = "ffmpeg";

/// Sidecar suffix appended to the full media file name
pub const SIDECAR_SUFFIX: &str = ".json";

/// How video files are written to the output folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    /// Copy both video and audio streams into a new container
    #[default]
    Remux,
    /// Copy the video stream, re-encode the audio stream
    ReencodeAudio,
}

/// Configuration for one organizer run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Root of the exported library
    pub input_root: PathBuf,

    /// Folder receiving the organized files, created if absent
    pub output_root: PathBuf,

    /// Show external tool output and debug logging
    pub verbose: bool,

    /// Also process live-photo companion videos that have no sidecar of their own
    pub keep_live_photo_videos: bool,

    /// Pixel constraint for the image resize
    pub max_dimension: u32,

    /// Video stream handling
    pub video_mode: VideoMode,

    /// Ask the transcoder to carry container metadata tags over
    pub preserve_video_metadata: bool,

    /// Write resized PNG sources as JPG
    pub png_to_jpg: bool,

    /// Transcoder executable, also used for image resizing when no resizer is set
    pub transcoder_program: String,

    /// Dedicated resizer executable
    /// Invoked as `<program> <max-dimension> <src> <dst> [-verbose]`
    pub resizer_program: Option<String>,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::new(),
            output_root: PathBuf::new(),
            verbose: false,
            keep_live_photo_videos: false,
            max_dimension: DEFAULT_MAX_DIMENSION,
            video_mode: VideoMode::default(),
            preserve_video_metadata: true,
            png_to_jpg: true,
            transcoder_program: DEFAULT_TRANSCODER.to_string(),
            resizer_program: None,
        }
    }
}

impl OrganizerConfig {
    /// Create a new config for the given input and output folders
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            ..Default::default()
        }
    }

    /// Create a config builder
    pub fn builder() -> OrganizerConfigBuilder {
        OrganizerConfigBuilder::new()
    }

    /// Extensions handled by the video strategy
    pub fn video_extensions() -> HashSet<String> {
        ["mp4", "mov"].iter().map(|s| s.to_string()).collect()
    }

    /// Extensions probed for live-photo companions, in probe order
    pub fn companion_extensions() -> &'static [&'static str] {
        &["mp4", "mov"]
    }

    /// Check if an extension belongs to the video strategy
    pub fn is_video_extension(ext: &str) -> bool {
        Self::video_extensions().contains(&ext.to_lowercase())
    }

}

/// Builder for OrganizerConfig
#[derive(Debug, Default)]
pub struct OrganizerConfigBuilder {
    config: OrganizerConfig,
}

impl OrganizerConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input root
    pub fn input_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_root = path.into();
        self
    }

    /// Set the output root
    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    /// Enable or disable verbose output
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose = enabled;
        self
    }

    /// Enable or disable live-photo companion discovery
    pub fn keep_live_photo_videos(mut self, enabled: bool) -> Self {
        self.config.keep_live_photo_videos = enabled;
        self
    }

    /// Set the resize constraint
    pub fn max_dimension(mut self, pixels: u32) -> Self {
        self.config.max_dimension = pixels;
        self
    }

    /// Set the video mode
    pub fn video_mode(mut self, mode: VideoMode) -> Self {
        self.config.video_mode = mode;
        self
    }

    /// Enable or disable container metadata preservation
    pub fn preserve_video_metadata(mut self, enabled: bool) -> Self {
        self.config.preserve_video_metadata = enabled;
        self
    }

    /// Enable or disable PNG to JPG normalization
    pub fn png_to_jpg(mut self, enabled: bool) -> Self {
        self.config.png_to_jpg = enabled;
        self
    }

    /// Set the transcoder executable
    pub fn transcoder_program(mut self, program: impl Into<String>) -> Self {
        self.config.transcoder_program = program.into();
        self
    }

    /// Set a dedicated resizer executable
    pub fn resizer_program(mut self, program: Option<String>) -> Self {
        self.config.resizer_program = program;
        self
    }

    /// Build the config
    pub fn build(self) -> OrganizerConfig {
        self.config
    }
}
