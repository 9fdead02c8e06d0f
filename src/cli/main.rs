//! White Background Erasure CLI Tool
//!
//! Command-line interface for erasing near-white backgrounds from every image
//! in a directory.

use super::{config::CliConfigBuilder, progress::BarProgressReporter};
use crate::{
    orchestrator::BatchOrchestrator,
    services::{ImageIOService, LogProgressReporter, ProgressReporter},
    tracing_config::init_cli_tracing,
    util::format_elapsed,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use tracing::debug;

/// Erase white backgrounds from images
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "whitebg-erase")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Directory of images to process
    #[arg(value_name = "SRC")]
    pub src: PathBuf,

    /// Destination directory for results [default: "<SRC> results" next to SRC]
    #[arg(long, value_name = "PATH")]
    pub dst: Option<PathBuf>,

    /// Luminosity threshold (0.0-1.0)
    #[arg(long, default_value_t = 0.95)]
    pub lum_thresh: f32,

    /// Sigma for the Gaussian filter (0 disables smoothing)
    #[arg(long, default_value_t = 1.0)]
    pub gaussian: f32,

    /// Hole area threshold in pixels
    #[arg(long, default_value_t = 750)]
    pub hole_thresh: usize,

    /// Ensure a white border before processing
    #[arg(long)]
    pub check_border: bool,

    /// Border strip thickness in pixels
    #[arg(long, default_value_t = 10)]
    pub border_thick: u32,

    /// Minimum number of white sides for the margin scan (0-4)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(0..=4))]
    pub border_sides: u8,

    /// Border test variant
    #[arg(long, value_enum, default_value_t = CliBorderTest::MarginScan)]
    pub border_test: CliBorderTest,

    /// Border luminosity threshold [default: same as --lum-thresh]
    #[arg(long)]
    pub border_thresh: Option<f32>,

    /// Copy images failing the border test aside
    #[arg(long)]
    pub copy_failed: bool,

    /// Directory for border test rejects [default: "failed_border_test" next to SRC]
    #[arg(long, value_name = "PATH")]
    pub failed_dir: Option<PathBuf>,

    /// Draw the foreground boundary in red instead of erasing
    #[arg(long)]
    pub mark_bounds: bool,

    /// Number of images per batch
    #[arg(long, default_value_t = 20)]
    pub batch_size: usize,

    /// Number of worker threads [default: CPU count]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = CliOutputFormat::Png)]
    pub format: CliOutputFormat,

    /// Only process file names matching this glob (e.g., "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Skip images that cannot be read or written instead of aborting
    #[arg(long)]
    pub keep_going: bool,

    /// Directory for timestamped log files
    #[arg(long, value_name = "PATH", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,

    /// Show a progress bar across batches
    #[arg(long)]
    pub progress: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Png,
    Tiff,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliBorderTest {
    /// Mean of each edge strip, counted against --border-sides
    MarginScan,
    /// One mean over the whole frame
    BorderRegion,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = (!cli.no_log_file).then_some(cli.log_dir.as_path());
    let _logging = init_cli_tracing(cli.verbose, log_dir).context("Failed to initialize tracing")?;

    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let params = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    info!("Starting white background erasure");
    info!("Source: {}", params.source_dir.display());
    info!("Destination: {}", params.output_dir.display());
    debug!(
        batch_size = params.batch_size,
        workers = params.workers,
        check_border = params.check_border,
        "Configuration"
    );

    let entries = ImageIOService::scan_directory(&params.source_dir, params.pattern.as_deref())
        .context("Failed to scan source directory")?;
    if entries.is_empty() {
        warn!("No supported images found in {}", params.source_dir.display());
    }

    let reporter: Box<dyn ProgressReporter> = if cli.progress {
        Box::new(BarProgressReporter::new(entries.len(), cli.verbose > 0))
    } else {
        Box::new(LogProgressReporter::new(cli.verbose > 0))
    };

    let orchestrator = BatchOrchestrator::new(&params)
        .context("Failed to start worker pool")?
        .with_reporter(reporter);
    let report = orchestrator
        .run_entries(&entries)
        .context("Batch run aborted")?;

    if !report.is_clean() {
        anyhow::bail!(
            "{} of {} images could not be processed (took {})",
            report.failures.len(),
            report.total_files,
            format_elapsed(report.elapsed)
        );
    }
    Ok(())
}
