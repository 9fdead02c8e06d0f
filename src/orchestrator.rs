//! Batch orchestration
//!
//! Splits the sorted file list into fixed-size batches and drives each batch
//! through `Loading -> BorderFiltering -> Erasing -> Saving -> Done`. Every
//! stage fans out over the shared worker pool and waits for all of its tasks
//! before the next stage starts. Batches run one after another.

use crate::{
    batch::{batch_count, chunk_entries, entry_names, partition_by_verdict, BatchItem, FileEntry},
    border::classify,
    config::{FailurePolicy, RunParameters},
    eraser::erase_white_background,
    error::{EraseError, Result},
    pool::WorkerPool,
    services::{
        BatchReport, ImageIOService, ItemFailure, LogProgressReporter, ProgressReporter,
        RunReport, StageKind, StageReport,
    },
};
use instant::Instant;
use std::{collections::HashMap, path::PathBuf, time::Duration};
use tracing::{debug, info, info_span, warn};

/// Result of driving one batch through all stages
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Written result paths, in batch order
    pub saved: Vec<PathBuf>,
    /// Entries rejected by the border test
    pub rejected: Vec<FileEntry>,
    /// Isolated per-image failures
    pub failures: Vec<ItemFailure>,
    pub elapsed: Duration,
}

/// Drives batch runs over a source directory
///
/// Owns the worker pool for the lifetime of the run; dropping the
/// orchestrator joins the worker threads.
pub struct BatchOrchestrator<'a> {
    params: &'a RunParameters,
    pool: WorkerPool,
    reporter: Box<dyn ProgressReporter>,
}

impl<'a> BatchOrchestrator<'a> {
    /// Create an orchestrator that reports to the log
    ///
    /// # Errors
    /// - `Processing` if the worker pool cannot be started
    pub fn new(params: &'a RunParameters) -> Result<Self> {
        Ok(Self {
            params,
            pool: WorkerPool::new(params.workers)?,
            reporter: Box::new(LogProgressReporter::default()),
        })
    }

    /// Replace the progress reporter
    #[must_use]
    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Scan the source directory and process every image in it
    pub fn run(&self) -> Result<RunReport> {
        let entries =
            ImageIOService::scan_directory(&self.params.source_dir, self.params.pattern.as_deref())?;
        self.run_entries(&entries)
    }

    /// Process an already sorted list of entries
    pub fn run_entries(&self, entries: &[FileEntry]) -> Result<RunReport> {
        let start = Instant::now();
        if let Ok(json) = serde_json::to_string(self.params) {
            debug!(params = %json, "Run parameters");
        }

        ImageIOService::ensure_dir(&self.params.output_dir)?;
        if self.params.check_border && self.params.copy_failed {
            ImageIOService::ensure_dir(&self.params.failed_dir)?;
        }
        self.warn_on_output_collisions(entries);

        let total_batches = batch_count(entries.len(), self.params.batch_size);
        self.reporter.report_start(entries.len(), total_batches);
        info!(
            files = entries.len(),
            batches = total_batches,
            workers = self.pool.workers(),
            "Starting run"
        );

        let mut report = RunReport {
            total_files: entries.len(),
            ..RunReport::default()
        };
        for (index, chunk) in chunk_entries(entries, self.params.batch_size).enumerate() {
            let outcome = self.process_batch(index, total_batches, chunk)?;
            report.batches += 1;
            report.saved.extend(outcome.saved);
            report
                .skipped
                .extend(outcome.rejected.into_iter().map(|entry| entry.name));
            report.failures.extend(outcome.failures);
        }

        report.elapsed = start.elapsed();
        self.reporter.report_run(&report);
        Ok(report)
    }

    /// Drive one batch through every stage
    pub fn process_batch(
        &self,
        index: usize,
        total_batches: usize,
        chunk: &[FileEntry],
    ) -> Result<BatchOutcome> {
        let _span = info_span!("batch", index = index + 1, size = chunk.len()).entered();
        let start = Instant::now();
        let mut outcome = BatchOutcome::default();

        let (items, failures) = self.load_stage(index, chunk)?;
        outcome.failures.extend(failures);

        let items = if self.params.check_border {
            let (kept, rejected, failures) = self.border_stage(index, items)?;
            outcome.rejected = rejected;
            outcome.failures.extend(failures);
            kept
        } else {
            items
        };

        let (items, failures) = self.erase_stage(index, items)?;
        outcome.failures.extend(failures);

        let (saved, failures) = self.save_stage(index, items)?;
        outcome.saved = saved;
        outcome.failures.extend(failures);

        outcome.elapsed = start.elapsed();
        self.reporter.report_stage(&StageReport {
            batch_index: index,
            stage: StageKind::Done,
            processed: outcome.saved.len(),
            skipped: outcome.rejected.len() + outcome.failures.len(),
            elapsed: outcome.elapsed,
            files: Vec::new(),
            skipped_files: Vec::new(),
        });
        self.reporter.report_batch(&BatchReport {
            index,
            total_batches,
            size: chunk.len(),
            saved: outcome.saved.len(),
            skipped: outcome.rejected.len(),
            failed: outcome.failures.len(),
            elapsed: outcome.elapsed,
        });
        Ok(outcome)
    }

    fn load_stage(
        &self,
        index: usize,
        chunk: &[FileEntry],
    ) -> Result<(Vec<BatchItem>, Vec<ItemFailure>)> {
        let start = Instant::now();
        let results = self.pool.map(chunk, |entry| {
            ImageIOService::load_image(&entry.path)
                .map(|image| BatchItem::new(entry.clone(), image))
                .map_err(|e| (entry.clone(), e))
        });
        let (items, failures) = self.settle(StageKind::Loading, results)?;

        self.report_stage(index, StageKind::Loading, start, entry_names(&items), &failures);
        Ok((items, failures))
    }

    fn border_stage(
        &self,
        index: usize,
        items: Vec<BatchItem>,
    ) -> Result<(Vec<BatchItem>, Vec<FileEntry>, Vec<ItemFailure>)> {
        let start = Instant::now();
        let border = &self.params.border;
        let verdicts = self.pool.map(&items, |item| {
            classify(&item.image, border).map(|verdict| {
                debug!(
                    file = %item.entry.name,
                    means = ?verdict.means,
                    passing = verdict.passing,
                    passed = verdict.passed,
                    "Border verdict"
                );
                verdict.passed
            })
        });
        let verdicts = verdicts.into_iter().collect::<Result<Vec<bool>>>()?;

        let (kept, rejected) = partition_by_verdict(items, &verdicts)?;
        let rejected: Vec<FileEntry> = rejected.into_iter().map(|item| item.entry).collect();

        let mut failures = Vec::new();
        if self.params.copy_failed && !rejected.is_empty() {
            let failed_dir = &self.params.failed_dir;
            let results = self.pool.map(&rejected, |entry| {
                ImageIOService::copy_to_dir(entry, failed_dir).map_err(|e| (entry.clone(), e))
            });
            let (copied, copy_failures) = self.settle(StageKind::BorderFiltering, results)?;
            debug!(copied = copied.len(), dir = %failed_dir.display(), "Copied border rejects");
            failures = copy_failures;
        }

        let elapsed = start.elapsed();
        self.reporter.report_stage(&StageReport {
            batch_index: index,
            stage: StageKind::BorderFiltering,
            processed: kept.len(),
            skipped: rejected.len(),
            elapsed,
            files: entry_names(&kept),
            skipped_files: rejected.iter().map(|entry| entry.name.clone()).collect(),
        });
        Ok((kept, rejected, failures))
    }

    fn erase_stage(
        &self,
        index: usize,
        items: Vec<BatchItem>,
    ) -> Result<(Vec<BatchItem>, Vec<ItemFailure>)> {
        let start = Instant::now();
        let mask_params = &self.params.mask;
        let mark_bounds = self.params.mark_bounds;
        let results = self.pool.map_owned(items, |item| {
            match erase_white_background(&item.image, mask_params, mark_bounds) {
                Ok(erased) => Ok(item.with_image(erased)),
                Err(e) => Err((item.entry, e)),
            }
        });
        let (items, failures) = self.settle(StageKind::Erasing, results)?;

        self.report_stage(index, StageKind::Erasing, start, entry_names(&items), &failures);
        Ok((items, failures))
    }

    fn save_stage(
        &self,
        index: usize,
        items: Vec<BatchItem>,
    ) -> Result<(Vec<PathBuf>, Vec<ItemFailure>)> {
        let start = Instant::now();
        let output_dir = &self.params.output_dir;
        let format = self.params.output_format;
        let results = self.pool.map(&items, |item| {
            let path = ImageIOService::output_path(output_dir, &item.entry, format);
            ImageIOService::save_image(&item.image, &path, format)
                .map(|()| path)
                .map_err(|e| (item.entry.clone(), e))
        });
        let (saved, failures) = self.settle(StageKind::Saving, results)?;

        let names = saved
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        self.report_stage(index, StageKind::Saving, start, names, &failures);
        Ok((saved, failures))
    }

    /// Apply the failure policy to the results of a stage
    ///
    /// Under `Isolate`, I/O failures are reported and dropped while the
    /// surviving results stay in order. Every other error aborts the run.
    fn settle<T>(
        &self,
        stage: StageKind,
        results: Vec<std::result::Result<T, (FileEntry, EraseError)>>,
    ) -> Result<(Vec<T>, Vec<ItemFailure>)> {
        let mut kept = Vec::with_capacity(results.len());
        let mut failures = Vec::new();

        for result in results {
            match result {
                Ok(value) => kept.push(value),
                Err((entry, error)) => {
                    let isolate =
                        self.params.failure_policy == FailurePolicy::Isolate && error.is_io();
                    if !isolate {
                        return Err(error);
                    }
                    let failure = ItemFailure {
                        name: entry.name,
                        stage,
                        message: error.to_string(),
                    };
                    warn!(file = %failure.name, stage = %stage, "Dropping image: {}", failure.message);
                    self.reporter.report_error(&failure);
                    failures.push(failure);
                },
            }
        }
        Ok((kept, failures))
    }

    fn report_stage(
        &self,
        index: usize,
        stage: StageKind,
        start: Instant,
        files: Vec<String>,
        failures: &[ItemFailure],
    ) {
        self.reporter.report_stage(&StageReport {
            batch_index: index,
            stage,
            processed: files.len(),
            skipped: failures.len(),
            elapsed: start.elapsed(),
            files,
            skipped_files: failures.iter().map(|f| f.name.clone()).collect(),
        });
    }

    fn warn_on_output_collisions(&self, entries: &[FileEntry]) {
        let mut seen: HashMap<PathBuf, &str> = HashMap::new();
        for entry in entries {
            let path =
                ImageIOService::output_path(&self.params.output_dir, entry, self.params.output_format);
            if let Some(previous) = seen.insert(path.clone(), &entry.name) {
                warn!(
                    "{} and {} both write to {}; the later file wins",
                    previous,
                    entry.name,
                    path.display()
                );
            }
        }
    }
}
