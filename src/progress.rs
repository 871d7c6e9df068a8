//! Console progress reporting for an organizer run
//!
//! Messages go through the `log` facade so the binary's logger decides
//! where and how they appear.

use log::{error, info};
use std::cell::Cell;
use std::time::Duration;

use crate::config::OrganizerConfig;
use crate::models::{ItemOutcome, MediaSidecarPair, RunReport};

/// Reports the start, per-item progress, failures and the end of a run
pub struct ProgressReporter {
    /// Number of items announced so far
    processed: Cell<usize>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    /// Create a new reporter
    pub fn new() -> Self {
        Self {
            processed: Cell::new(0),
        }
    }

    /// Report run start
    pub fn report_start(&self, config: &OrganizerConfig) {
        info!("takeout organizer starting");
        info!("input folder: {}", config.input_root.display());
        info!("output folder: {}", config.output_root.display());
        if config.keep_live_photo_videos {
            info!("keeping live-photo videos");
        }
    }

    /// Report the number of discovered pairs
    pub fn report_discovered(&self, count: usize) {
        info!("found {} media files with sidecar metadata", count);
    }

    /// Report that an item is about to be processed
    pub fn report_item(&self, pair: &MediaSidecarPair, total: usize) {
        let index = self.processed.get() + 1;
        self.processed.set(index);
        info!("");
        info!("[{}/{}] processing file:", index, total);
        info!("{}", pair.media_path().display());
    }

    /// Report a failed item
    pub fn report_failure(&self, outcome: &ItemOutcome) {
        if let Some(message) = &outcome.error {
            error!(
                "failed to process file:\n{}\n{}",
                outcome.pair.media_path().display(),
                message
            );
        }
    }

    /// Report run completion
    pub fn report_done(&self, report: &RunReport) {
        info!("");
        info!(
            "finished in {} ({} items)",
            format_duration(Duration::from_millis(report.duration_ms)),
            report.items.len()
        );
    }
}

/// Format a duration as `1h 02m 03.456s`, dropping leading zero units
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;

    if hours > 0 {
        format!("{hours}h {minutes:02}m {seconds:02}.{millis:03}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}.{millis:03}s")
    } else {
        format!("{seconds}.{millis:03}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(0)), "0.000s");
        assert_eq!(format_duration(Duration::from_millis(1_234)), "1.234s");
        assert_eq!(format_duration(Duration::from_millis(61_005)), "1m 01.005s");
        assert_eq!(
            format_duration(Duration::from_millis(3_723_456)),
            "1h 02m 03.456s"
        );
    }

    #[test]
    fn test_report_item_counts() {
        let reporter = ProgressReporter::new();
        let pair = MediaSidecarPair::new("/in/a.jpg", "/in/a.jpg.json");
        reporter.report_item(&pair, 2);
        reporter.report_item(&pair, 2);
        assert_eq!(reporter.processed.get(), 2);
    }

    #[test]
    fn test_report_failure_and_done_do_not_panic() {
        let reporter = ProgressReporter::new();
        let pair = MediaSidecarPair::new("/in/b.mp4", "/in/b.mp4.json");
        reporter.report_failure(&ItemOutcome::failed(pair.clone(), "exit 1"));
        reporter.report_failure(&ItemOutcome::copied(pair, PathBuf::from("/out/b.mp4")));
        reporter.report_done(&RunReport::new());
        assert_eq!(reporter.processed.get(), 0);
    }
}
