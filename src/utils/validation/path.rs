//! Path validation utilities
//!
//! Provides centralized validation for source directories and image extensions.

use crate::error::{EraseError, Result};
use std::path::Path;

/// Validator for file system paths and extensions
pub struct PathValidator;

impl PathValidator {
    /// Validate that a path is an existing directory
    pub fn validate_is_directory<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if !path_ref.is_dir() {
            return Err(EraseError::invalid_config(format!(
                "Source must be a directory: {}",
                path_ref.display()
            )));
        }
        Ok(())
    }

    /// Validate that a path is usable as an output directory
    ///
    /// The directory may not exist yet, but the path must not name a file.
    pub fn validate_output_directory<P: AsRef<Path>>(path: P) -> Result<()> {
        let path_ref = path.as_ref();

        if path_ref.is_file() {
            return Err(EraseError::invalid_config(format!(
                "Output path exists and is a file, not a directory: {}",
                path_ref.display()
            )));
        }
        Ok(())
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_image_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                Self::supported_image_extensions().contains(&ext.to_lowercase().as_str())
            })
    }

    /// Get the list of supported image extensions
    #[must_use]
    pub fn supported_image_extensions() -> &'static [&'static str] {
        #[cfg(feature = "webp-support")]
        const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "tif", "bmp"];
        #[cfg(not(feature = "webp-support"))]
        const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "bmp"];
        EXTENSIONS
    }
}
