//! Service layer
//!
//! This module contains service types that separate infrastructure concerns
//! (file I/O, progress reporting) from the pipeline stages.

pub mod io;
pub mod progress;

pub use io::ImageIOService;
pub use progress::{
    BatchReport, ItemFailure, LogProgressReporter, NoOpProgressReporter, ProgressReporter,
    RunReport, StageKind, StageReport,
};
