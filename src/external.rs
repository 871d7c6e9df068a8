//! External tool capabilities: the video transcoder and the image resizer
//!
//! Both tools are black boxes judged only by their exit status. Their
//! stdout/stderr are discarded unless the run is verbose, in which case
//! they are inherited from this process.

use log::debug;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::{OrganizerConfig, VideoMode};
use crate::error::OrganizeError;

/// Exit status of a finished external process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ProcessOutcome {
    /// Outcome with the given exit code
    pub fn with_code(code: i32) -> Self {
        Self {
            exit_code: Some(code),
        }
    }

    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A video transcode request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: VideoMode,
    pub preserve_metadata: bool,
}

/// Scale filter chosen from the source orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleFilter {
    /// Landscape source: fixed height, width follows the aspect ratio
    FixedHeight(u32),
    /// Portrait or square source: fixed width, height follows the aspect ratio
    FixedWidth(u32),
}

impl ScaleFilter {
    /// Pick the filter for a source of `width` x `height`
    pub fn for_dimensions(width: u32, height: u32, max_dimension: u32) -> Self {
        if width > height {
            ScaleFilter::FixedHeight(max_dimension)
        } else {
            ScaleFilter::FixedWidth(max_dimension)
        }
    }

    /// Filter expression, e.g. `scale=-1:1920`
    pub fn to_filter(&self) -> String {
        match self {
            ScaleFilter::FixedHeight(px) => format!("scale=-1:{px}"),
            ScaleFilter::FixedWidth(px) => format!("scale={px}:-1"),
        }
    }
}

/// An image resize request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub max_dimension: u32,
    pub scale: ScaleFilter,
}

/// Video transcoder capability
pub trait Transcoder {
    /// Run the transcode and wait for it to finish
    fn transcode(&self, request: &TranscodeRequest) -> Result<ProcessOutcome, OrganizeError>;
}

/// Image resizer capability
pub trait Resizer {
    /// Run the resize and wait for it to finish
    fn resize(&self, request: &ResizeRequest) -> Result<ProcessOutcome, OrganizeError>;
}

/// Spawn `program args...` and block until it exits
///
/// The working directory is the destination's parent folder when it has one.
fn run_tool(
    program: &str,
    args: &[OsString],
    destination: &Path,
    verbose: bool,
) -> Result<ProcessOutcome, OrganizeError> {
    debug!("running {} {:?}", program, args);

    let mut command = Command::new(program);
    command.args(args);
    if let Some(parent) = destination.parent() {
        if parent.is_dir() {
            command.current_dir(parent);
        }
    }
    if verbose {
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    } else {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }

    let status = command
        .status()
        .map_err(|e| OrganizeError::subprocess(destination, format!("failed to run {program}: {e}")))?;

    debug!("{} exited with {:?}", program, status.code());
    Ok(ProcessOutcome {
        exit_code: status.code(),
    })
}

/// Transcoder backed by an ffmpeg-compatible executable
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    verbose: bool,
}

impl FfmpegTranscoder {
    /// Create a transcoder running `program`
    pub fn new(program: impl Into<String>, verbose: bool) -> Self {
        Self {
            program: program.into(),
            verbose,
        }
    }

    /// Create a transcoder from the run configuration
    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self::new(config.transcoder_program.clone(), config.verbose)
    }

    /// Arguments for a transcode request
    pub fn transcode_args(request: &TranscodeRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-i".into(), request.source.clone().into()];
        args.extend(["-c:v", "copy"].map(OsString::from));
        match request.mode {
            VideoMode::Remux => args.extend(["-c:a", "copy"].map(OsString::from)),
            VideoMode::ReencodeAudio => args.extend(["-c:a", "aac"].map(OsString::from)),
        }
        if request.preserve_metadata {
            args.extend(
                ["-map_metadata", "0", "-movflags", "use_metadata_tags"].map(OsString::from),
            );
        }
        args.push(request.destination.clone().into());
        args
    }

    /// Arguments for a resize through the `scale` video filter
    pub fn resize_args(request: &ResizeRequest) -> Vec<OsString> {
        vec![
            "-i".into(),
            request.source.clone().into(),
            "-vf".into(),
            request.scale.to_filter().into(),
            request.destination.clone().into(),
        ]
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, request: &TranscodeRequest) -> Result<ProcessOutcome, OrganizeError> {
        let args = Self::transcode_args(request);
        run_tool(&self.program, &args, &request.destination, self.verbose)
    }
}

impl Resizer for FfmpegTranscoder {
    fn resize(&self, request: &ResizeRequest) -> Result<ProcessOutcome, OrganizeError> {
        let args = Self::resize_args(request);
        run_tool(&self.program, &args, &request.destination, self.verbose)
    }
}

/// Resizer backed by a dedicated executable
///
/// Invoked as `<program> <max-dimension> <src> <dst> [-verbose]`.
#[derive(Debug, Clone)]
pub struct CommandResizer {
    program: String,
    verbose: bool,
}

impl CommandResizer {
    /// Create a resizer running `program`
    pub fn new(program: impl Into<String>, verbose: bool) -> Self {
        Self {
            program: program.into(),
            verbose,
        }
    }

    /// Arguments for a resize request
    pub fn resize_args(&self, request: &ResizeRequest) -> Vec<OsString> {
        let mut args = vec![
            request.max_dimension.to_string().into(),
            request.source.clone().into(),
            request.destination.clone().into(),
        ];
        if self.verbose {
            args.push("-verbose".into());
        }
        args
    }
}

impl Resizer for CommandResizer {
    fn resize(&self, request: &ResizeRequest) -> Result<ProcessOutcome, OrganizeError> {
        let args = self.resize_args(request);
        run_tool(&self.program, &args, &request.destination, self.verbose)
    }
}

/// Resizer selected by the configuration
pub fn resizer_from_config(config: &OrganizerConfig) -> Box<dyn Resizer> {
    match &config.resizer_program {
        Some(program) => Box::new(CommandResizer::new(program.clone(), config.verbose)),
        None => Box::new(FfmpegTranscoder::from_config(config)),
    }
}
