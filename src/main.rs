//! Takeout Organizer CLI
//!
//! Copies an exported photo library into one output folder.

use clap::error::ErrorKind;
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use takeout_organizer::config::{DEFAULT_MAX_DIMENSION, DEFAULT_TRANSCODER};
use takeout_organizer::{FatalError, Organizer, OrganizerConfig, VideoMode};

const ABOUT: &str = r#"
Takeout Organizer - copies an exported photo library into one folder

Every file with a matching `<file>.json` sidecar is copied to the output
folder. Videos go through the transcoder, JPG/PNG images are resized with
their metadata preserved, and each output file gets the capture time from
its sidecar as modification time.

Usage examples:
  takeout_organizer ./Takeout ./Organized
  takeout_organizer ./Takeout ./Organized -verbose -keep_live_photo_videos
  takeout_organizer ./Takeout ./Organized --resizer img-resize --keep-png
  takeout_organizer ./Takeout ./Organized --json > report.json
"#;

const USAGE_HINT: &str =
    "usage: takeout_organizer <INPUT_FOLDER_PATH> <OUTPUT_FOLDER_PATH> [-verbose] [-keep_live_photo_videos]";

/// Organize an exported photo library
#[derive(Parser, Debug)]
#[command(name = "takeout_organizer")]
#[command(version, about = ABOUT, long_about = None)]
#[command(help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
")]
struct Cli {
    /// Folder of the exported library
    #[arg(value_name = "INPUT_FOLDER_PATH")]
    input: Option<PathBuf>,

    /// Folder receiving the organized files (created if missing)
    #[arg(value_name = "OUTPUT_FOLDER_PATH")]
    output: Option<PathBuf>,

    /// Show external tool output and debug logging
    #[arg(long)]
    verbose: bool,

    /// Also copy live-photo videos that share a photo's sidecar
    #[arg(long = "keep-live-photo-videos", alias = "keep_live_photo_videos")]
    keep_live_photo_videos: bool,

    /// Re-encode video audio instead of copying it
    #[arg(long)]
    reencode_audio: bool,

    /// Do not carry container metadata tags over to output videos
    #[arg(long)]
    no_video_metadata: bool,

    /// Keep PNG sources as PNG instead of writing JPG
    #[arg(long)]
    keep_png: bool,

    /// Pixel constraint for resized images
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION)]
    max_dimension: u32,

    /// Transcoder executable
    #[arg(long, default_value = DEFAULT_TRANSCODER)]
    transcoder: String,

    /// Dedicated resizer executable, called as `<resizer> <max-dimension> <src> <dst> [-verbose]`
    #[arg(long)]
    resizer: Option<String>,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// Map the single-dash spellings to the flags clap knows
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-verbose") => "--verbose".into(),
            Some("-keep_live_photo_videos") => "--keep-live-photo-videos".into(),
            Some("-help") | Some("/?") => "--help".into(),
            _ => arg,
        })
        .collect()
}

fn non_blank(value: Option<PathBuf>, which: &'static str) -> Result<PathBuf, FatalError> {
    match value {
        Some(v) if !v.to_string_lossy().trim().is_empty() => Ok(v),
        _ => Err(FatalError::MissingArgument(which)),
    }
}

fn build_config(cli: Cli) -> Result<OrganizerConfig, FatalError> {
    let input = non_blank(cli.input, "first")?;
    let output = non_blank(cli.output, "second")?;

    let video_mode = if cli.reencode_audio {
        VideoMode::ReencodeAudio
    } else {
        VideoMode::Remux
    };

    Ok(OrganizerConfig::builder()
        .input_root(input)
        .output_root(output)
        .verbose(cli.verbose)
        .keep_live_photo_videos(cli.keep_live_photo_videos)
        .video_mode(video_mode)
        .preserve_video_metadata(!cli.no_video_metadata)
        .png_to_jpg(!cli.keep_png)
        .max_dimension(cli.max_dimension)
        .transcoder_program(cli.transcoder)
        .resizer_program(cli.resizer)
        .build())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let json = cli.json;
    let config = match build_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", USAGE_HINT);
            return ExitCode::from(e.exit_code());
        }
    };
    info!("Config: {:?}", config);

    let mut organizer = Organizer::with_system_capabilities(config);
    match organizer.run() {
        Ok(report) => {
            if json {
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => error!("failed to serialize run report: {}", e),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
