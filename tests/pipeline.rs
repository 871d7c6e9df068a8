//! End-to-end runs of the organizer with fake external tools

use chrono::{TimeZone, Utc};
use filetime::FileTime;
use image::{ImageFormat, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

use takeout_organizer::{
    Capabilities, EmbeddedMetadata, LocalFs, Organizer, OrganizerConfig, OrganizeError,
    ProcessOutcome, ResizeRequest, Resizer, TranscodeRequest, Transcoder,
};

/// Copies source to destination on success, does nothing otherwise
struct CopyingTool {
    exit_code: i32,
}

impl Transcoder for CopyingTool {
    fn transcode(&self, request: &TranscodeRequest) -> Result<ProcessOutcome, OrganizeError> {
        if self.exit_code == 0 {
            fs::copy(&request.source, &request.destination)?;
        }
        Ok(ProcessOutcome::with_code(self.exit_code))
    }
}

impl Resizer for CopyingTool {
    fn resize(&self, request: &ResizeRequest) -> Result<ProcessOutcome, OrganizeError> {
        if self.exit_code == 0 {
            fs::copy(&request.source, &request.destination)?;
        }
        Ok(ProcessOutcome::with_code(self.exit_code))
    }
}

fn capabilities(transcoder_exit: i32) -> Capabilities {
    Capabilities {
        copier: Box::new(LocalFs),
        deleter: Box::new(LocalFs),
        directories: Box::new(LocalFs),
        transcoder: Box::new(CopyingTool {
            exit_code: transcoder_exit,
        }),
        resizer: Box::new(CopyingTool { exit_code: 0 }),
        exporter: Box::new(EmbeddedMetadata),
        importer: Box::new(EmbeddedMetadata),
    }
}

fn write_sidecar(path: &Path, formatted: &str) {
    let json = serde_json::json!({
        "title": path.file_stem().unwrap().to_string_lossy(),
        "photoTakenTime": { "timestamp": "0", "formatted": formatted },
    });
    fs::write(path, json.to_string()).unwrap();
}

fn modified_seconds(path: &Path) -> i64 {
    FileTime::from_last_modification_time(&fs::metadata(path).unwrap()).unix_seconds()
}

#[test]
fn test_image_is_copied_and_stamped() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("Takeout");
    let output = dir.path().join("Organized");
    fs::create_dir_all(&input).unwrap();
    RgbImage::new(40, 30)
        .save_with_format(input.join("a.jpg"), ImageFormat::Jpeg)
        .unwrap();
    write_sidecar(&input.join("a.jpg.json"), "Jan 1, 2020, 12:00:00 AM UTC");

    let mut organizer = Organizer::new(OrganizerConfig::new(&input, &output), capabilities(0));
    let report = organizer.run().unwrap();

    assert_eq!(report.items.len(), 1);
    assert!(report.items[0].is_success());
    let expected = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(report.items[0].stamped_time, Some(expected));
    assert_eq!(modified_seconds(&output.join("a.jpg")), expected.timestamp());
}

#[test]
fn test_failed_transcode_does_not_abort_run() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("b.mp4"), b"video").unwrap();
    write_sidecar(&input.join("b.mp4.json"), "Nov 2, 2022, 4:54:41\u{202f}PM UTC");
    fs::write(input.join("c.txt"), b"text").unwrap();
    write_sidecar(&input.join("c.txt.json"), "Nov 2, 2022, 4:54:41\u{202f}PM UTC");

    let mut organizer = Organizer::new(OrganizerConfig::new(&input, &output), capabilities(1));
    let report = organizer.run().unwrap();

    assert_eq!(report.items.len(), 2);
    assert_eq!(report.failure_count(), 1);

    let video = report.outcome_for(&input.join("b.mp4")).unwrap();
    assert!(!video.is_success());
    assert!(video.error.as_deref().unwrap().contains("b.mp4"));
    assert!(!output.join("b.mp4").exists());

    let text = report.outcome_for(&input.join("c.txt")).unwrap();
    assert!(text.is_success());
    assert_eq!(fs::read(output.join("c.txt")).unwrap(), b"text");
    assert_eq!(
        modified_seconds(&output.join("c.txt")),
        Utc.with_ymd_and_hms(2022, 11, 2, 16, 54, 41)
            .unwrap()
            .timestamp()
    );
}

#[test]
fn test_live_photo_video_shares_sidecar_time() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("c.heic"), b"heic").unwrap();
    write_sidecar(&input.join("c.heic.json"), "Mar 3, 2021, 7:08:09 AM UTC");
    fs::write(input.join("c.mov"), b"mov").unwrap();

    let config = OrganizerConfig::builder()
        .input_root(&input)
        .output_root(&output)
        .keep_live_photo_videos(true)
        .build();
    let mut organizer = Organizer::new(config, capabilities(0));
    let report = organizer.run().unwrap();

    assert_eq!(report.items.len(), 2);
    let sidecar = input.join("c.heic.json");
    for item in &report.items {
        assert!(item.is_success());
        assert_eq!(item.pair.sidecar_path(), sidecar);
    }

    let expected = Utc.with_ymd_and_hms(2021, 3, 3, 7, 8, 9).unwrap().timestamp();
    assert_eq!(modified_seconds(&output.join("c.heic")), expected);
    assert_eq!(modified_seconds(&output.join("c.mov")), expected);
}

#[test]
fn test_unreadable_timestamp_keeps_copy() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("d.gif"), b"gif").unwrap();
    fs::write(input.join("d.gif.json"), r#"{"title":"d.gif"}"#).unwrap();

    let mut organizer = Organizer::new(OrganizerConfig::new(&input, &output), capabilities(0));
    let report = organizer.run().unwrap();

    assert_eq!(report.items.len(), 1);
    assert!(report.items[0].is_success());
    assert!(report.items[0].stamped_time.is_none());
    assert!(output.join("d.gif").is_file());
}

#[test]
fn test_png_written_as_jpg_with_metadata_round_trip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();
    RgbImage::new(20, 40)
        .save_with_format(input.join("shot.png"), ImageFormat::Png)
        .unwrap();
    write_sidecar(&input.join("shot.png.json"), "Jan 1, 2020, 12:00:00 AM UTC");

    // A resizer that writes a real JPEG, as the external tool would
    struct JpegResizer;
    impl Resizer for JpegResizer {
        fn resize(&self, request: &ResizeRequest) -> Result<ProcessOutcome, OrganizeError> {
            RgbImage::new(10, 20)
                .save_with_format(&request.destination, ImageFormat::Jpeg)
                .map_err(|e| OrganizeError::subprocess(&request.destination, e.to_string()))?;
            Ok(ProcessOutcome::with_code(0))
        }
    }

    let mut capabilities = capabilities(0);
    capabilities.resizer = Box::new(JpegResizer);
    let mut organizer = Organizer::new(OrganizerConfig::new(&input, &output), capabilities);
    let report = organizer.run().unwrap();

    assert!(report.items[0].is_success(), "{:?}", report.items[0].error);
    let written = output.join("shot.jpg");
    assert_eq!(report.items[0].output_path.as_deref(), Some(written.as_path()));
    assert_eq!(image::image_dimensions(&written).unwrap(), (10, 20));
    assert!(!output.join("shot.png").exists());
}

#[test]
fn test_missing_input_is_fatal() {
    let dir = tempdir().unwrap();
    let mut organizer = Organizer::new(
        OrganizerConfig::new(dir.path().join("nope"), dir.path().join("out")),
        capabilities(0),
    );
    let err = organizer.run().unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(!dir.path().join("out").exists());
}
