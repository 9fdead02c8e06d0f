//! Configuration types for background erasure runs

use crate::{
    error::{EraseError, Result},
    utils::{default_worker_count, NumericValidator, PathValidator},
};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the directory that receives images rejected by the border test
pub const FAILED_BORDER_DIR_NAME: &str = "failed_border_test";

/// Default number of images processed between stage barriers
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Output image format options
///
/// Both formats are lossless and carry an alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// TIFF with alpha channel transparency and lossless compression
    Tiff,
}

impl OutputFormat {
    /// File extension used for saved results
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Tiff => "tiff",
        }
    }

    /// Matching `image` crate format
    #[must_use]
    pub fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Tiff => image::ImageFormat::Tiff,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Which white border heuristic to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum BorderTest {
    /// Mean of each of the four edge strips, counted against `min_passing_sides`
    #[default]
    MarginScan,
    /// One mean over the whole frame outside the inset inner rectangle
    BorderRegion,
}

impl std::fmt::Display for BorderTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarginScan => write!(f, "margin-scan"),
            Self::BorderRegion => write!(f, "border-region"),
        }
    }
}

/// What to do when a single image cannot be loaded, erased or saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FailurePolicy {
    /// Abort the whole run on the first failure
    #[default]
    Abort,
    /// Log the failure, drop the image from its batch and continue
    Isolate,
}

/// Parameters of the luminosity mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskParams {
    /// Pixels at or above this luminosity are background (0.0-1.0)
    pub lum_threshold: f32,
    /// Standard deviation of the Gaussian smoothing (0 disables smoothing)
    pub sigma: f32,
    /// Background regions smaller than this many pixels are kept as foreground
    pub hole_threshold: usize,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            lum_threshold: 0.95,
            sigma: 1.0,
            hole_threshold: 750,
        }
    }
}

impl MaskParams {
    /// Validate thresholds and sigma
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_unit_interval(self.lum_threshold, "Luminosity threshold")?;
        NumericValidator::validate_non_negative(self.sigma, "Gaussian sigma")?;
        Ok(())
    }
}

/// Parameters of the white border test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderParams {
    /// Minimum mean luminosity for a border strip to count as white (0.0-1.0)
    pub lum_threshold: f32,
    /// Width of the border strips in pixels
    pub thickness: u32,
    /// Number of white strips required to pass (0-4, margin scan only)
    pub min_passing_sides: u8,
    /// Heuristic variant applied to every image of the run
    pub test: BorderTest,
}

impl Default for BorderParams {
    fn default() -> Self {
        Self {
            lum_threshold: 0.95,
            thickness: 10,
            min_passing_sides: 3,
            test: BorderTest::MarginScan,
        }
    }
}

impl BorderParams {
    /// Validate threshold, thickness and side count
    pub fn validate(&self) -> Result<()> {
        NumericValidator::validate_unit_interval(self.lum_threshold, "Border threshold")?;
        NumericValidator::validate_positive(self.thickness, "Border thickness")?;
        NumericValidator::validate_range(self.min_passing_sides, 0, 4, "Border sides")?;
        Ok(())
    }
}

/// Immutable parameters of one batch run
///
/// Built once at startup with [`RunParameters::builder`] and passed by
/// reference to every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunParameters {
    /// Directory whose images are processed
    pub source_dir: PathBuf,
    /// Directory receiving the erased images
    pub output_dir: PathBuf,
    /// Directory receiving copies of border test rejects
    pub failed_dir: PathBuf,
    /// Luminosity mask parameters
    pub mask: MaskParams,
    /// Border test parameters
    pub border: BorderParams,
    /// Run the border test before erasing
    pub check_border: bool,
    /// Copy border test rejects into `failed_dir`
    pub copy_failed: bool,
    /// Draw the foreground boundary instead of erasing the background
    pub mark_bounds: bool,
    /// Number of images per batch
    pub batch_size: usize,
    /// Number of worker threads
    pub workers: usize,
    /// Output image format
    pub output_format: OutputFormat,
    /// Reaction to per-image I/O failures
    pub failure_policy: FailurePolicy,
    /// Optional glob restricting which file names are processed
    pub pattern: Option<String>,
}

impl RunParameters {
    /// Create a builder for the given source directory
    #[must_use]
    pub fn builder<P: Into<PathBuf>>(source_dir: P) -> RunParametersBuilder {
        RunParametersBuilder::new(source_dir)
    }

    /// Validate all parameters
    ///
    /// # Errors
    /// - Source is not a directory
    /// - Output or failed directory names an existing file
    /// - Numeric parameter out of range
    /// - Pattern is not a valid glob
    pub fn validate(&self) -> Result<()> {
        PathValidator::validate_is_directory(&self.source_dir)?;
        PathValidator::validate_output_directory(&self.output_dir)?;
        if self.copy_failed {
            PathValidator::validate_output_directory(&self.failed_dir)?;
        }

        self.mask.validate()?;
        self.border.validate()?;

        if self.batch_size == 0 {
            return Err(EraseError::config_value_error(
                "batch size",
                self.batch_size,
                ">= 1",
                Some(DEFAULT_BATCH_SIZE),
            ));
        }
        NumericValidator::validate_worker_count(self.workers)?;

        if let Some(pattern) = &self.pattern {
            glob::Pattern::new(pattern).map_err(|e| {
                EraseError::invalid_config(format!("Invalid file pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(())
    }
}

/// Default output directory: a `<name> results` sibling of the source
#[must_use]
pub fn default_output_dir(source_dir: &Path) -> PathBuf {
    let name = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    source_parent(source_dir).join(format!("{} results", name))
}

/// Default directory for border test rejects, next to the source
#[must_use]
pub fn default_failed_dir(source_dir: &Path) -> PathBuf {
    source_parent(source_dir).join(FAILED_BORDER_DIR_NAME)
}

/// Absolute form of `path`, with `.` and `..` resolved lexically
///
/// Symlinks are not followed. Relative paths are taken against the current
/// directory.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| EraseError::file_io_error("resolve current directory", path, &e))?
            .join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                resolved.pop();
            },
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

fn source_parent(source_dir: &Path) -> &Path {
    source_dir
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Builder for `RunParameters`
#[derive(Debug)]
pub struct RunParametersBuilder {
    source_dir: PathBuf,
    output_dir: Option<PathBuf>,
    failed_dir: Option<PathBuf>,
    mask: MaskParams,
    border: BorderParams,
    check_border: bool,
    copy_failed: bool,
    mark_bounds: bool,
    batch_size: usize,
    workers: Option<usize>,
    output_format: OutputFormat,
    failure_policy: FailurePolicy,
    pattern: Option<String>,
}

impl RunParametersBuilder {
    /// Create a builder with documented defaults
    #[must_use]
    pub fn new<P: Into<PathBuf>>(source_dir: P) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: None,
            failed_dir: None,
            mask: MaskParams::default(),
            border: BorderParams::default(),
            check_border: false,
            copy_failed: false,
            mark_bounds: false,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: None,
            output_format: OutputFormat::default(),
            failure_policy: FailurePolicy::default(),
            pattern: None,
        }
    }

    /// Set the output directory (default: `<src> results` sibling)
    #[must_use]
    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the directory for border test rejects
    #[must_use]
    pub fn failed_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.failed_dir = Some(dir.into());
        self
    }

    /// Replace all mask parameters
    #[must_use]
    pub fn mask(mut self, mask: MaskParams) -> Self {
        self.mask = mask;
        self
    }

    /// Set the mask luminosity threshold
    #[must_use]
    pub fn lum_threshold(mut self, threshold: f32) -> Self {
        self.mask.lum_threshold = threshold;
        self
    }

    /// Set the Gaussian sigma
    #[must_use]
    pub fn sigma(mut self, sigma: f32) -> Self {
        self.mask.sigma = sigma;
        self
    }

    /// Set the hole area threshold
    #[must_use]
    pub fn hole_threshold(mut self, pixels: usize) -> Self {
        self.mask.hole_threshold = pixels;
        self
    }

    /// Replace all border parameters
    #[must_use]
    pub fn border(mut self, border: BorderParams) -> Self {
        self.border = border;
        self
    }

    /// Enable or disable the border test stage
    #[must_use]
    pub fn check_border(mut self, enabled: bool) -> Self {
        self.check_border = enabled;
        self
    }

    /// Enable or disable copying border test rejects
    #[must_use]
    pub fn copy_failed(mut self, enabled: bool) -> Self {
        self.copy_failed = enabled;
        self
    }

    /// Enable or disable boundary marking mode
    #[must_use]
    pub fn mark_bounds(mut self, enabled: bool) -> Self {
        self.mark_bounds = enabled;
        self
    }

    /// Set the batch size
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the number of worker threads (default: CPU count)
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the failure policy
    #[must_use]
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Restrict processing to file names matching a glob
    #[must_use]
    pub fn pattern<S: Into<String>>(mut self, pattern: Option<S>) -> Self {
        self.pattern = pattern.map(Into::into);
        self
    }

    /// Resolve defaults and validate
    ///
    /// The source directory is made absolute first, so `.` and `..` get
    /// default directories next to the directory they name.
    pub fn build(self) -> Result<RunParameters> {
        let source_dir = absolute_path(&self.source_dir)?;
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| default_output_dir(&source_dir));
        let failed_dir = self
            .failed_dir
            .unwrap_or_else(|| default_failed_dir(&source_dir));

        let params = RunParameters {
            source_dir,
            output_dir,
            failed_dir,
            mask: self.mask,
            border: self.border,
            check_border: self.check_border,
            copy_failed: self.copy_failed,
            mark_bounds: self.mark_bounds,
            batch_size: self.batch_size,
            workers: self.workers.unwrap_or_else(default_worker_count),
            output_format: self.output_format,
            failure_policy: self.failure_policy,
            pattern: self.pattern,
        };
        params.validate()?;
        Ok(params)
    }
}
