#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # White Background Erasure Library
//!
//! Batch erasure of near-uniform white backgrounds. Each image gets a
//! luminosity mask (Gaussian smoothing, Rec.709 luminosity, threshold, small
//! region cleanup); background pixels become transparent, or the foreground
//! outline is drawn in red. An optional white border test filters out images
//! that do not sit on a white background.
//!
//! ## Features
//!
//! - **Luminosity Masks**: configurable threshold, blur sigma and hole size
//! - **Border Test**: four-strip margin scan or single frame mean
//! - **Batch Runs**: fixed-size batches over a bounded worker pool with
//!   per-stage progress reports
//! - **Format Support**: reads JPEG, PNG, WebP, BMP, TIFF; writes PNG or TIFF
//!   with alpha at the source bit depth
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ### Single image
//!
//! ```rust,no_run
//! use whitebg_erase::{erase_white_background, MaskParams};
//!
//! # fn example() -> anyhow::Result<()> {
//! let image = image::open("product.jpg")?;
//! let result = erase_white_background(&image, &MaskParams::default(), false)?;
//! result.save("product.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Whole directory
//!
//! ```rust,no_run
//! use whitebg_erase::{erase_directory, RunParameters};
//!
//! # fn example() -> anyhow::Result<()> {
//! let params = RunParameters::builder("scans")
//!     .check_border(true)
//!     .batch_size(20)
//!     .build()?;
//! let report = erase_directory(&params)?;
//! println!("saved {} images", report.processed_count());
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `cli` (default): Command-line interface, progress bar and log file setup
//! - `webp-support` (default): WebP input support
//! - `tracing-json`: JSON console log format
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! whitebg-erase = { version = "0.1", default-features = false }
//! ```

pub mod batch;
pub mod border;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod eraser;
pub mod error;
pub mod mask;
pub mod orchestrator;
pub mod pool;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod util;
pub mod utils;

// Public API exports
pub use batch::{BatchItem, FileEntry};
pub use border::{classify, is_white_bordered, BorderVerdict};
pub use config::{
    BorderParams, BorderTest, FailurePolicy, MaskParams, OutputFormat, RunParameters,
    RunParametersBuilder,
};
pub use eraser::{erase, erase_white_background};
pub use error::{EraseError, Result};
pub use mask::{compute_mask, ErasureMask};
pub use orchestrator::{BatchOrchestrator, BatchOutcome};
pub use pool::WorkerPool;
pub use services::{
    BatchReport, ImageIOService, ItemFailure, LogProgressReporter, NoOpProgressReporter,
    ProgressReporter, RunReport, StageKind, StageReport,
};
pub use utils::{NumericValidator, PathValidator};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, LoggingGuard, TracingConfig, TracingFormat};

/// Process every image of `params.source_dir`, logging progress
///
/// # Errors
/// - Source directory cannot be scanned
/// - Worker pool cannot be started
/// - Any image fails under [`FailurePolicy::Abort`]
pub fn erase_directory(params: &RunParameters) -> Result<RunReport> {
    BatchOrchestrator::new(params)?.run()
}

/// Erase the white background of a single file and save the result
///
/// # Errors
/// - Input cannot be decoded or output cannot be written
/// - Image is empty or parameters are out of range
pub fn erase_file<P: AsRef<std::path::Path>, Q: AsRef<std::path::Path>>(
    input: P,
    output: Q,
    params: &MaskParams,
    mark_bounds_only: bool,
    format: OutputFormat,
) -> Result<()> {
    let image = ImageIOService::load_image(input)?;
    let result = erase_white_background(&image, params, mark_bounds_only)?;
    ImageIOService::save_image(&result, output, format)
}
