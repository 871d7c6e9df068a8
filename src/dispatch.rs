//! Dispatch - picks a copy strategy per media file and runs it
//!
//! | Extension (any case)     | Strategy                                   |
//! |--------------------------|--------------------------------------------|
//! | `mp4`, `mov`             | transcoder remux / audio re-encode         |
//! | `jpg`, `jpeg`, `png`     | metadata export, resize, metadata import   |
//! | anything else            | byte-for-byte copy                         |

use log::info;
use std::path::{Path, PathBuf};

use crate::config::OrganizerConfig;
use crate::error::OrganizeError;
use crate::external::{ResizeRequest, Resizer, ScaleFilter, TranscodeRequest, Transcoder};
use crate::fs_ops::{is_same_path, ByteCopier, DirectoryCreator, PathDeleter};
use crate::image_metadata::{ImageMetadataExporter, ImageMetadataImporter};
use crate::models::{ImageKind, MediaKind, MediaSidecarPair};

/// Every capability the pipeline depends on
pub struct Capabilities {
    pub copier: Box<dyn ByteCopier>,
    pub deleter: Box<dyn PathDeleter>,
    pub directories: Box<dyn DirectoryCreator>,
    pub transcoder: Box<dyn Transcoder>,
    pub resizer: Box<dyn Resizer>,
    pub exporter: Box<dyn ImageMetadataExporter>,
    pub importer: Box<dyn ImageMetadataImporter>,
}

impl Capabilities {
    /// Real filesystem, external tools from the configuration, embedded metadata round trip
    pub fn system(config: &OrganizerConfig) -> Self {
        use crate::external::{resizer_from_config, FfmpegTranscoder};
        use crate::fs_ops::LocalFs;
        use crate::image_metadata::EmbeddedMetadata;

        Self {
            copier: Box::new(LocalFs),
            deleter: Box::new(LocalFs),
            directories: Box::new(LocalFs),
            transcoder: Box::new(FfmpegTranscoder::from_config(config)),
            resizer: resizer_from_config(config),
            exporter: Box::new(EmbeddedMetadata),
            importer: Box::new(EmbeddedMetadata),
        }
    }
}

/// Output location for a media file: the output root plus the media's file name
///
/// PNG sources become `.jpg` when `png_to_jpg` is set.
pub fn output_path_for(
    media_path: &Path,
    output_root: &Path,
    png_to_jpg: bool,
) -> Result<PathBuf, OrganizeError> {
    let file_name = media_path
        .file_name()
        .ok_or_else(|| OrganizeError::invalid_path(media_path, "media path has no file name"))?;
    let output = output_root.join(file_name);

    if png_to_jpg && MediaKind::classify(media_path) == MediaKind::Image(ImageKind::Png) {
        return Ok(output.with_extension("jpg"));
    }
    Ok(output)
}

/// Runs the copy strategy for one pair
pub struct Dispatcher<'a> {
    config: &'a OrganizerConfig,
    capabilities: &'a Capabilities,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher
    pub fn new(config: &'a OrganizerConfig, capabilities: &'a Capabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    /// Copy or transcode a pair's media into the output root
    ///
    /// Returns the written output path.
    pub fn dispatch(&self, pair: &MediaSidecarPair) -> Result<PathBuf, OrganizeError> {
        let source = pair.media_path();
        let destination = output_path_for(source, &self.config.output_root, self.config.png_to_jpg)?;
        if is_same_path(source, &destination) {
            return Err(OrganizeError::invalid_path(
                &destination,
                "output file is the source file",
            ));
        }
        let kind = MediaKind::classify(source);

        info!("copying {} file: {}", kind, source.display());
        info!("to: {}", destination.display());

        match kind {
            MediaKind::Video => self.copy_video(source, &destination)?,
            MediaKind::Image(image_kind) => self.copy_image(source, &destination, image_kind)?,
            MediaKind::Other => {
                self.capabilities.copier.copy_file(source, &destination)?;
            }
        }
        Ok(destination)
    }

    fn copy_video(&self, source: &Path, destination: &Path) -> Result<(), OrganizeError> {
        self.capabilities.deleter.delete_file(destination)?;

        let request = TranscodeRequest {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            mode: self.config.video_mode,
            preserve_metadata: self.config.preserve_video_metadata,
        };
        let outcome = self.capabilities.transcoder.transcode(&request)?;
        if !outcome.success() {
            return Err(OrganizeError::subprocess(
                destination,
                format!("transcoder exited with {:?}", outcome.exit_code),
            ));
        }
        Ok(())
    }

    /// Export, resize, import. A failed import leaves the resized file in place.
    fn copy_image(
        &self,
        source: &Path,
        destination: &Path,
        kind: ImageKind,
    ) -> Result<(), OrganizeError> {
        self.capabilities.deleter.delete_file(destination)?;

        let export = self.capabilities.exporter.export(source, kind)?;
        let request = ResizeRequest {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            max_dimension: self.config.max_dimension,
            scale: ScaleFilter::for_dimensions(
                export.width(),
                export.height(),
                self.config.max_dimension,
            ),
        };
        let outcome = self.capabilities.resizer.resize(&request)?;
        if !outcome.success() {
            return Err(OrganizeError::subprocess(
                destination,
                format!("resizer exited with {:?}", outcome.exit_code),
            ));
        }

        self.capabilities
            .importer
            .import(destination, export.document_path())
    }
}
