//! Progress bar reporter for the CLI

use crate::services::{
    BatchReport, ItemFailure, LogProgressReporter, ProgressReporter, RunReport, StageReport,
};
use indicatif::{ProgressBar, ProgressStyle};

/// Drives an `indicatif` bar over all files of a run
///
/// Log output is forwarded to a [`LogProgressReporter`] with the bar
/// suspended, so lines and bar do not interleave.
pub struct BarProgressReporter {
    bar: ProgressBar,
    log: LogProgressReporter,
}

impl BarProgressReporter {
    #[must_use]
    pub fn new(total_files: usize, verbose: bool) -> Self {
        let bar = ProgressBar::new(total_files as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self {
            bar,
            log: LogProgressReporter::new(verbose),
        }
    }
}

impl ProgressReporter for BarProgressReporter {
    fn report_start(&self, total_files: usize, total_batches: usize) {
        self.bar
            .suspend(|| self.log.report_start(total_files, total_batches));
    }

    fn report_stage(&self, report: &StageReport) {
        self.bar.set_message(format!(
            "batch {}: {}",
            report.batch_index + 1,
            report.stage.description()
        ));
        self.bar.suspend(|| self.log.report_stage(report));
    }

    fn report_batch(&self, report: &BatchReport) {
        self.bar.inc(report.size as u64);
        self.bar.suspend(|| self.log.report_batch(report));
    }

    fn report_run(&self, report: &RunReport) {
        self.bar.finish_with_message(format!(
            "{} saved, {} skipped, {} failed",
            report.processed_count(),
            report.skipped.len(),
            report.failures.len()
        ));
        self.log.report_run(report);
    }

    fn report_error(&self, failure: &ItemFailure) {
        self.bar.suspend(|| self.log.report_error(failure));
    }
}
