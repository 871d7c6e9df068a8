//! Organizer - the sequential discovery, dispatch and timestamp pipeline
//!
//! Each pair is fully processed before the next one starts. Nothing that
//! goes wrong inside one item escapes it: copy failures are logged and
//! recorded, timestamp failures only skip the stamping step.

use log::{error, warn};
use std::path::Path;
use std::time::Instant;

use crate::config::OrganizerConfig;
use crate::discovery::discover_pairs;
use crate::dispatch::{output_path_for, Capabilities, Dispatcher};
use crate::error::FatalError;
use crate::fs_ops::is_same_path;
use crate::models::{ItemOutcome, MediaSidecarPair, RunReport};
use crate::progress::ProgressReporter;
use crate::timestamp::{apply_modified_time, read_capture_instant};

/// One organizer run over an input folder
pub struct Organizer {
    config: OrganizerConfig,
    capabilities: Capabilities,
}

impl Organizer {
    /// Create an organizer with explicit capabilities
    pub fn new(config: OrganizerConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    /// Create an organizer on the real filesystem and external tools
    pub fn with_system_capabilities(config: OrganizerConfig) -> Self {
        let capabilities = Capabilities::system(&config);
        Self::new(config, capabilities)
    }

    /// Resolve both roots, check the input folder and create the output folder
    ///
    /// An output folder that resolves to the input folder is rejected, since
    /// every output file would then overwrite its own source.
    pub fn prepare(&mut self) -> Result<(), FatalError> {
        let input = std::path::absolute(&self.config.input_root).map_err(|e| {
            FatalError::UnresolvableInput {
                path: self.config.input_root.clone(),
                message: e.to_string(),
            }
        })?;
        if !input.is_dir() {
            return Err(FatalError::InputMissing(input));
        }

        let output = std::path::absolute(&self.config.output_root).map_err(|e| {
            FatalError::InvalidOutput {
                path: self.config.output_root.clone(),
                message: e.to_string(),
            }
        })?;
        if is_same_path(&input, &output) {
            return Err(FatalError::InvalidOutput {
                path: output,
                message: "output folder is the input folder".to_string(),
            });
        }

        self.capabilities
            .directories
            .create_directories(&output)
            .map_err(|source| FatalError::OutputNotCreated {
                path: output.clone(),
                source,
            })?;

        self.config.input_root = input;
        self.config.output_root = output;
        Ok(())
    }

    /// Run the whole pipeline
    ///
    /// Only pre-flight problems are returned as errors; per-item failures
    /// are part of the report.
    pub fn run(&mut self) -> Result<RunReport, FatalError> {
        let start = Instant::now();
        let reporter = ProgressReporter::new();
        reporter.report_start(&self.config);

        self.prepare()?;

        let pairs = discover_pairs(&self.config.input_root, self.config.keep_live_photo_videos);
        reporter.report_discovered(pairs.len());

        let total = pairs.len();
        let mut report = RunReport::new();
        for pair in pairs {
            reporter.report_item(&pair, total);
            let outcome = self.process_pair(pair);
            reporter.report_failure(&outcome);
            report.items.push(outcome);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        reporter.report_done(&report);
        Ok(report)
    }

    /// Copy one pair and stamp its capture time
    pub fn process_pair(&self, pair: MediaSidecarPair) -> ItemOutcome {
        let dispatcher = Dispatcher::new(&self.config, &self.capabilities);
        let output = match dispatcher.dispatch(&pair) {
            Ok(output) => output,
            Err(e) => {
                let destination = output_path_for(
                    pair.media_path(),
                    &self.config.output_root,
                    self.config.png_to_jpg,
                )
                .unwrap_or_else(|_| self.config.output_root.clone());
                return ItemOutcome::failed(
                    pair,
                    format!("failed to copy to {}: {}", destination.display(), e),
                );
            }
        };

        let outcome = ItemOutcome::copied(pair, output.clone());
        match stamp_capture_time(outcome.pair.sidecar_path(), &output) {
            Some(instant) => outcome.with_stamped_time(instant),
            None => outcome,
        }
    }
}

/// Apply the sidecar's capture time to `output`; failures are logged and skipped
fn stamp_capture_time(sidecar: &Path, output: &Path) -> Option<chrono::DateTime<chrono::Utc>> {
    let instant = match read_capture_instant(sidecar) {
        Ok(instant) => instant,
        Err(e) => {
            warn!(
                "failed to parse photo taken time from JSON file:\n{}\n{}",
                sidecar.display(),
                e
            );
            return None;
        }
    };

    match apply_modified_time(output, instant) {
        Ok(()) => Some(instant),
        Err(e) => {
            error!(
                "failed to set modification time of {} to {}: {}",
                output.display(),
                instant,
                e
            );
            None
        }
    }
}
