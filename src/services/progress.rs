//! Progress reporting service
//!
//! This module separates progress reporting concerns from the batch pipeline,
//! allowing different frontends to implement their own progress handling.

use crate::util::format_elapsed;
use serde::Serialize;
use std::{path::PathBuf, time::Duration};

/// Stages of the per-batch state machine, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageKind {
    /// Decoding the batch's files
    Loading,
    /// Running the white border test and dropping rejects
    BorderFiltering,
    /// Computing masks and erasing backgrounds
    Erasing,
    /// Writing results to the output directory
    Saving,
    /// Batch completed
    Done,
}

impl StageKind {
    /// Get a human-readable description of the stage
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            StageKind::Loading => "Loading images",
            StageKind::BorderFiltering => "Checking white borders",
            StageKind::Erasing => "Erasing white backgrounds",
            StageKind::Saving => "Saving results",
            StageKind::Done => "Batch completed",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageKind::Loading => "loading",
            StageKind::BorderFiltering => "border filtering",
            StageKind::Erasing => "erasing",
            StageKind::Saving => "saving",
            StageKind::Done => "done",
        };
        f.write_str(name)
    }
}

/// Summary emitted after every stage barrier
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Zero-based batch index
    pub batch_index: usize,
    pub stage: StageKind,
    /// Items that came out of the stage
    pub processed: usize,
    /// Items dropped by the stage (border rejects or isolated failures)
    pub skipped: usize,
    /// Wall time of the stage
    pub elapsed: Duration,
    /// Names of the processed items, in batch order
    pub files: Vec<String>,
    /// Names of the dropped items, in batch order
    pub skipped_files: Vec<String>,
}

/// A single image that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    /// File name of the failed entry
    pub name: String,
    pub stage: StageKind,
    pub message: String,
}

/// Summary emitted after every batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Zero-based batch index
    pub index: usize,
    pub total_batches: usize,
    /// Files in the batch before any filtering
    pub size: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Files discovered in the source directory
    pub total_files: usize,
    /// Number of batches processed
    pub batches: usize,
    /// Paths of all written results, in file-list order
    pub saved: Vec<PathBuf>,
    /// Names of border test rejects
    pub skipped: Vec<String>,
    /// Isolated per-image failures
    pub failures: Vec<ItemFailure>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of images written
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.saved.len()
    }

    /// Whether every discovered file was either saved or rejected on purpose
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Trait for reporting progress of a batch run
pub trait ProgressReporter: Send + Sync {
    /// Report the start of a run
    fn report_start(&self, total_files: usize, total_batches: usize) {
        let _ = (total_files, total_batches);
    }

    /// Report the end of a stage barrier
    fn report_stage(&self, report: &StageReport);

    /// Report the end of a batch
    fn report_batch(&self, report: &BatchReport);

    /// Report the end of the run
    fn report_run(&self, report: &RunReport);

    /// Report an isolated per-image failure
    fn report_error(&self, failure: &ItemFailure);
}

/// No-op progress reporter that discards all progress updates
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_stage(&self, _report: &StageReport) {
        // Intentionally empty - discards stage reports
    }

    fn report_batch(&self, _report: &BatchReport) {
        // Intentionally empty - discards batch reports
    }

    fn report_run(&self, _report: &RunReport) {
        // Intentionally empty - discards the run summary
    }

    fn report_error(&self, _failure: &ItemFailure) {
        // Intentionally empty - discards error reports
    }
}

/// Reporter that writes every report to the log
pub struct LogProgressReporter {
    verbose: bool,
}

impl LogProgressReporter {
    /// Create a new log reporter
    ///
    /// # Arguments
    /// * `verbose` - Whether to log per-file detail at debug level
    #[must_use]
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn stage_headline(report: &StageReport) -> String {
        match report.stage {
            StageKind::Loading => format!("Loaded {} images", report.processed),
            StageKind::BorderFiltering => format!(
                "{} of {} images have white border",
                report.processed,
                report.processed + report.skipped
            ),
            StageKind::Erasing => {
                format!("Erased white background from {} images", report.processed)
            },
            StageKind::Saving => format!("Saved {} images", report.processed),
            StageKind::Done => format!("Finished batch with {} images", report.processed),
        }
    }
}

impl Default for LogProgressReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ProgressReporter for LogProgressReporter {
    fn report_start(&self, total_files: usize, total_batches: usize) {
        log::info!(
            "Processing {} images in {} batches",
            total_files,
            total_batches
        );
    }

    fn report_stage(&self, report: &StageReport) {
        log::info!(
            "[batch {}] {} ({})",
            report.batch_index + 1,
            Self::stage_headline(report),
            format_elapsed(report.elapsed)
        );
        if !report.files.is_empty() {
            log::info!("{:?}", report.files);
        }
        if !report.skipped_files.is_empty() {
            log::info!("Skipping {} images:", report.skipped);
            log::info!("{:?}", report.skipped_files);
        }

        if self.verbose {
            for name in &report.files {
                log::debug!("  {} {}", report.stage, name);
            }
        }
    }

    fn report_batch(&self, report: &BatchReport) {
        log::info!(
            "Batch {}/{} done: {} saved, {} skipped, {} failed ({})",
            report.index + 1,
            report.total_batches,
            report.saved,
            report.skipped,
            report.failed,
            format_elapsed(report.elapsed)
        );
    }

    fn report_run(&self, report: &RunReport) {
        log::info!(
            "Finished processing {} images. Took {}.",
            report.processed_count(),
            format_elapsed(report.elapsed)
        );
        if !report.skipped.is_empty() {
            log::info!("{} images failed the border test", report.skipped.len());
        }
        if !report.failures.is_empty() {
            log::warn!("{} images could not be processed", report.failures.len());
            for failure in &report.failures {
                log::warn!("  {} ({}): {}", failure.name, failure.stage, failure.message);
            }
        }
    }

    fn report_error(&self, failure: &ItemFailure) {
        log::error!(
            "Error during {} of {}: {}",
            failure.stage,
            failure.name,
            failure.message
        );
    }
}
