//! Consolidated validation utilities
//!
//! Range and path checks used when building run parameters.

pub mod numeric;
pub mod path;

pub use numeric::{default_worker_count, NumericValidator};
pub use path::PathValidator;
