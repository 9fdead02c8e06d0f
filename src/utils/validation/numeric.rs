//! Numeric validation utilities
//!
//! Range checks shared by the run parameter builder and the CLI layer.

use crate::error::{EraseError, Result};

/// Validator for numeric parameters
pub struct NumericValidator;

impl NumericValidator {
    /// Validate a normalized luminosity value (0.0 to 1.0)
    pub fn validate_unit_interval(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() {
            return Err(EraseError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if !(0.0..=1.0).contains(&value) {
            return Err(EraseError::invalid_config(format!(
                "{} must be between 0.0 and 1.0, got {}",
                name, value
            )));
        }

        Ok(value)
    }

    /// Validate that a float is finite and not negative
    pub fn validate_non_negative(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() || value < 0.0 {
            return Err(EraseError::invalid_config(format!(
                "{} must be a finite value >= 0, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate worker count
    pub fn validate_worker_count(value: usize) -> Result<usize> {
        const MAX_WORKERS: usize = 256;

        if value == 0 {
            return Err(EraseError::config_value_error(
                "worker count",
                value,
                "1-256",
                Some(default_worker_count()),
            ));
        }

        if value > MAX_WORKERS {
            return Err(EraseError::invalid_config(format!(
                "Worker count {} exceeds maximum allowed ({})",
                value, MAX_WORKERS
            )));
        }

        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(EraseError::invalid_config(format!(
                "{} must be between {} and {}, got {}",
                name, min, max, value
            )));
        }
        Ok(value)
    }

    /// Validate that a value is positive
    pub fn validate_positive<T>(value: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy + Default,
    {
        if value <= T::default() {
            return Err(EraseError::invalid_config(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        Ok(value)
    }
}

/// Number of logical CPUs, falling back to 1
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}
