//! Reorganizes an exported cloud photo library into a flat output folder
//!
//! Media files are paired with their `.json` sidecars, copied, transcoded or
//! resized into the output folder, and stamped with the capture time found
//! in the sidecar.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod external;
pub mod fs_ops;
pub mod image_metadata;
pub mod models;
pub mod organizer;
pub mod progress;
pub mod timestamp;

pub use config::{OrganizerConfig, VideoMode};
pub use discovery::discover_pairs;
pub use dispatch::{output_path_for, Capabilities, Dispatcher};
pub use error::{FatalError, OrganizeError, OrganizeErrorKind};
pub use external::{ProcessOutcome, ResizeRequest, Resizer, ScaleFilter, TranscodeRequest, Transcoder};
pub use fs_ops::{ByteCopier, DirectoryCreator, LocalFs, PathDeleter};
pub use image_metadata::{
    EmbeddedMetadata, ImageMetadataExport, ImageMetadataExporter, ImageMetadataImporter,
};
pub use models::{ImageKind, ItemOutcome, MediaKind, MediaSidecarPair, RunReport};
pub use organizer::Organizer;
pub use progress::ProgressReporter;
pub use timestamp::{parse_formatted_time, read_capture_instant};
