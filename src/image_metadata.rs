//! Embedded image metadata round trip
//!
//! The resizer may drop EXIF/XMP/ICC data, so before a resize the source's
//! metadata and pixel dimensions are exported to a temporary JSON document,
//! and after the resize that document is imported into the output image.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use img_parts::jpeg::{markers, Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::{Bytes, ImageEXIF, ImageICC};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;

use crate::error::OrganizeError;
use crate::models::ImageKind;

/// APP1 payload prefix of an XMP packet in JPEG
const JPEG_XMP_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// iTXt keyword of an XMP packet in PNG
const PNG_XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp";

const PNG_ITXT: [u8; 4] = *b"iTXt";

/// Largest payload of one JPEG marker segment; the u16 length field counts itself
const JPEG_SEGMENT_MAX_CONTENTS: usize = u16::MAX as usize - 2;

/// APP1 payload prefix of an EXIF block in JPEG
const JPEG_EXIF_PREFIX: &[u8] = b"Exif\0\0";

/// ICC bytes carried by one APP2 segment after `ICC_PROFILE\0` and the two sequence bytes
const JPEG_ICC_CHUNK: usize = JPEG_SEGMENT_MAX_CONTENTS - 14;

/// The APP2 sequence number is a single byte
const JPEG_ICC_MAX_SEGMENTS: usize = 255;

/// Metadata exported from a source image, backed by a temporary document
///
/// The document is deleted when this value is dropped.
#[derive(Debug)]
pub struct ImageMetadataExport {
    width: u32,
    height: u32,
    document: TempPath,
}

impl ImageMetadataExport {
    /// Wrap an exported document
    pub fn new(width: u32, height: u32, document: TempPath) -> Self {
        Self {
            width,
            height,
            document,
        }
    }

    /// Source width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Source height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Path of the temporary metadata document
    pub fn document_path(&self) -> &Path {
        &self.document
    }
}

/// Reads metadata and dimensions out of a source image
pub trait ImageMetadataExporter {
    fn export(&self, source: &Path, kind: ImageKind) -> Result<ImageMetadataExport, OrganizeError>;
}

/// Writes an exported metadata document into an image
pub trait ImageMetadataImporter {
    fn import(&self, target: &Path, document: &Path) -> Result<(), OrganizeError>;
}

/// Serialized form of the exported metadata
///
/// Every block is base64 encoded, so XMP packets in any encoding survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exif: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub xmp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icc: Option<String>,
}

/// Raw metadata blocks of one image
#[derive(Debug, Default)]
struct MetadataBlocks {
    exif: Option<Bytes>,
    xmp: Option<Bytes>,
    icc: Option<Bytes>,
}

impl MetadataDocument {
    fn from_blocks(width: u32, height: u32, blocks: MetadataBlocks) -> Self {
        Self {
            width,
            height,
            exif: blocks.exif.map(|b| STANDARD.encode(&b)),
            xmp: blocks.xmp.map(|b| STANDARD.encode(&b)),
            icc: blocks.icc.map(|b| STANDARD.encode(&b)),
        }
    }

    fn to_blocks(&self, path: &Path) -> Result<MetadataBlocks, OrganizeError> {
        let decode = |value: &Option<String>| -> Result<Option<Bytes>, OrganizeError> {
            value
                .as_ref()
                .map(|s| {
                    STANDARD
                        .decode(s)
                        .map(Bytes::from)
                        .map_err(|e| OrganizeError::metadata(path, format!("bad base64 block: {e}")))
                })
                .transpose()
        };
        Ok(MetadataBlocks {
            exif: decode(&self.exif)?,
            xmp: decode(&self.xmp)?,
            icc: decode(&self.icc)?,
        })
    }
}

/// Pure-Rust JPEG/PNG metadata exporter and importer
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedMetadata;

fn jpeg_xmp(jpeg: &Jpeg) -> Option<Bytes> {
    jpeg.segments()
        .iter()
        .find(|s| s.marker() == markers::APP1 && s.contents().starts_with(JPEG_XMP_PREFIX))
        .map(|s| s.contents().slice(JPEG_XMP_PREFIX.len()..))
}

fn is_jpeg_xmp(segment: &JpegSegment) -> bool {
    segment.marker() == markers::APP1 && segment.contents().starts_with(JPEG_XMP_PREFIX)
}

fn set_jpeg_xmp(jpeg: &mut Jpeg, xmp: Option<Bytes>) {
    let segments = jpeg.segments_mut();
    segments.retain(|s| !is_jpeg_xmp(s));
    if let Some(xmp) = xmp {
        let mut contents = JPEG_XMP_PREFIX.to_vec();
        contents.extend_from_slice(&xmp);
        // After the leading APPn segments
        let position = segments
            .iter()
            .position(|s| !(markers::APP0..=markers::APP15).contains(&s.marker()))
            .unwrap_or(segments.len());
        segments.insert(
            position,
            JpegSegment::new_with_contents(markers::APP1, Bytes::from(contents)),
        );
    }
}

fn is_png_xmp(chunk: &PngChunk) -> bool {
    chunk.kind() == PNG_ITXT
        && chunk.contents().starts_with(PNG_XMP_KEYWORD)
        && chunk.contents().get(PNG_XMP_KEYWORD.len()) == Some(&0)
}

/// Text of an uncompressed XMP iTXt chunk
///
/// Layout: keyword NUL, compression flag, compression method,
/// language tag NUL, translated keyword NUL, text.
fn png_xmp(png: &Png) -> Option<Bytes> {
    let chunk = png.chunks().iter().find(|c| is_png_xmp(c))?;
    let contents = chunk.contents();
    let rest = &contents[PNG_XMP_KEYWORD.len() + 1..];
    let (&compressed, rest) = rest.split_first()?;
    if compressed != 0 {
        return None;
    }
    let rest = rest.get(1..)?;
    let language_end = rest.iter().position(|b| *b == 0)?;
    let rest = &rest[language_end + 1..];
    let translated_end = rest.iter().position(|b| *b == 0)?;
    let text_start = contents.len() - rest.len() + translated_end + 1;
    Some(contents.slice(text_start..))
}

fn set_png_xmp(png: &mut Png, xmp: Option<Bytes>) {
    let chunks = png.chunks_mut();
    chunks.retain(|c| !is_png_xmp(c));
    if let Some(xmp) = xmp {
        let mut contents = PNG_XMP_KEYWORD.to_vec();
        contents.extend_from_slice(&[0, 0, 0, 0, 0]);
        contents.extend_from_slice(&xmp);
        // Right after IHDR
        let position = chunks.len().min(1);
        chunks.insert(position, PngChunk::new(PNG_ITXT, Bytes::from(contents)));
    }
}

/// Reject blocks that do not fit the JPEG segments they would be written to
fn check_jpeg_capacity(path: &Path, blocks: &MetadataBlocks) -> Result<(), OrganizeError> {
    let exif_limit = JPEG_SEGMENT_MAX_CONTENTS - JPEG_EXIF_PREFIX.len();
    let xmp_limit = JPEG_SEGMENT_MAX_CONTENTS - JPEG_XMP_PREFIX.len();
    // img-parts always adds one segment past `len / chunk`
    let icc_limit = JPEG_ICC_CHUNK * JPEG_ICC_MAX_SEGMENTS - 1;

    let checks = [
        ("EXIF", &blocks.exif, exif_limit),
        ("XMP", &blocks.xmp, xmp_limit),
        ("ICC", &blocks.icc, icc_limit),
    ];
    for (name, block, limit) in checks {
        if let Some(block) = block {
            if block.len() > limit {
                return Err(OrganizeError::metadata(
                    path,
                    format!(
                        "{name} block of {} bytes does not fit in JPEG (limit {limit})",
                        block.len()
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn read_blocks(path: &Path, kind: ImageKind, data: Bytes) -> Result<MetadataBlocks, OrganizeError> {
    let parse_error = |e: img_parts::Error| OrganizeError::metadata(path, format!("failed to parse image: {e}"));
    match kind {
        ImageKind::Jpeg => {
            let jpeg = Jpeg::from_bytes(data).map_err(parse_error)?;
            Ok(MetadataBlocks {
                exif: jpeg.exif(),
                xmp: jpeg_xmp(&jpeg),
                icc: jpeg.icc_profile(),
            })
        }
        ImageKind::Png => {
            let png = Png::from_bytes(data).map_err(parse_error)?;
            Ok(MetadataBlocks {
                exif: png.exif(),
                xmp: png_xmp(&png),
                icc: png.icc_profile(),
            })
        }
    }
}

fn write_blocks(
    path: &Path,
    kind: ImageKind,
    data: Bytes,
    blocks: MetadataBlocks,
) -> Result<Vec<u8>, OrganizeError> {
    let parse_error = |e: img_parts::Error| OrganizeError::metadata(path, format!("failed to parse image: {e}"));
    let mut out = Vec::new();
    let written = match kind {
        ImageKind::Jpeg => {
            check_jpeg_capacity(path, &blocks)?;
            let mut jpeg = Jpeg::from_bytes(data).map_err(parse_error)?;
            jpeg.set_exif(blocks.exif);
            jpeg.set_icc_profile(blocks.icc);
            set_jpeg_xmp(&mut jpeg, blocks.xmp);
            jpeg.encoder().write_to(&mut out)
        }
        ImageKind::Png => {
            let mut png = Png::from_bytes(data).map_err(parse_error)?;
            png.set_exif(blocks.exif);
            png.set_icc_profile(blocks.icc);
            set_png_xmp(&mut png, blocks.xmp);
            png.encoder().write_to(&mut out)
        }
    };
    written.map_err(|e| OrganizeError::io(path, e))?;
    Ok(out)
}

impl ImageMetadataExporter for EmbeddedMetadata {
    fn export(&self, source: &Path, kind: ImageKind) -> Result<ImageMetadataExport, OrganizeError> {
        let (width, height) = image::image_dimensions(source)
            .map_err(|e| OrganizeError::metadata(source, format!("failed to read dimensions: {e}")))?;

        let data = fs::read(source).map_err(|e| OrganizeError::io(source, e))?;
        let blocks = read_blocks(source, kind, Bytes::from(data))?;
        debug!(
            "exported metadata from {:?}: {}x{}, exif={} xmp={} icc={}",
            source,
            width,
            height,
            blocks.exif.is_some(),
            blocks.xmp.is_some(),
            blocks.icc.is_some()
        );
        let document = MetadataDocument::from_blocks(width, height, blocks);

        let mut file = tempfile::Builder::new()
            .prefix("takeout-metadata-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| OrganizeError::metadata(source, format!("failed to create metadata document: {e}")))?;
        serde_json::to_writer(&mut file, &document).map_err(|e| OrganizeError::from(e).with_path(source))?;
        file.flush().map_err(|e| OrganizeError::io(file.path(), e))?;

        Ok(ImageMetadataExport::new(width, height, file.into_temp_path()))
    }
}

impl ImageMetadataImporter for EmbeddedMetadata {
    fn import(&self, target: &Path, document: &Path) -> Result<(), OrganizeError> {
        let kind = ImageKind::from_path(target)
            .ok_or_else(|| OrganizeError::metadata(target, "unsupported image type for metadata import"))?;

        let content = fs::read_to_string(document).map_err(|e| OrganizeError::io(document, e))?;
        let document: MetadataDocument =
            serde_json::from_str(&content).map_err(|e| OrganizeError::from(e).with_path(document))?;
        let blocks = document.to_blocks(target)?;

        let data = fs::read(target).map_err(|e| OrganizeError::io(target, e))?;
        let updated = write_blocks(target, kind, Bytes::from(data), blocks)?;
        fs::write(target, updated).map_err(|e| OrganizeError::io(target, e))?;
        debug!("imported metadata into {:?}", target);
        Ok(())
    }
}
