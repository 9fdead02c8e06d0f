//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, CliBorderTest, CliOutputFormat};
use crate::{
    config::{BorderParams, BorderTest, FailurePolicy, MaskParams, OutputFormat, RunParameters},
    utils::NumericValidator,
};
use anyhow::{Context, Result};
use log::warn;

/// Convert CLI arguments to `RunParameters`
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build `RunParameters` from CLI arguments
    ///
    /// Default destination and failed directories are resolved relative to
    /// the source directory.
    pub(crate) fn from_cli(cli: &Cli) -> Result<RunParameters> {
        let mask = MaskParams {
            lum_threshold: cli.lum_thresh,
            sigma: cli.gaussian,
            hole_threshold: cli.hole_thresh,
        };
        let border = BorderParams {
            lum_threshold: cli.border_thresh.unwrap_or(cli.lum_thresh),
            thickness: cli.border_thick,
            min_passing_sides: cli.border_sides,
            test: match cli.border_test {
                CliBorderTest::MarginScan => BorderTest::MarginScan,
                CliBorderTest::BorderRegion => BorderTest::BorderRegion,
            },
        };
        let output_format = match cli.format {
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Tiff => OutputFormat::Tiff,
        };
        let failure_policy = if cli.keep_going {
            FailurePolicy::Isolate
        } else {
            FailurePolicy::Abort
        };

        let mut builder = RunParameters::builder(&cli.src)
            .mask(mask)
            .border(border)
            .check_border(cli.check_border)
            .copy_failed(cli.copy_failed)
            .mark_bounds(cli.mark_bounds)
            .batch_size(cli.batch_size)
            .output_format(output_format)
            .failure_policy(failure_policy)
            .pattern(cli.pattern.clone());

        if let Some(dst) = &cli.dst {
            builder = builder.output_dir(dst);
        }
        if let Some(failed_dir) = &cli.failed_dir {
            builder = builder.failed_dir(failed_dir);
        }
        if let Some(workers) = cli.workers {
            builder = builder.workers(workers);
        }

        builder.build().context("Invalid configuration")
    }

    /// Validate CLI arguments for consistency
    pub(crate) fn validate_cli(cli: &Cli) -> Result<()> {
        NumericValidator::validate_unit_interval(cli.lum_thresh, "--lum-thresh")
            .context("Invalid luminosity threshold")?;
        if let Some(threshold) = cli.border_thresh {
            NumericValidator::validate_unit_interval(threshold, "--border-thresh")
                .context("Invalid border threshold")?;
        }
        NumericValidator::validate_non_negative(cli.gaussian, "--gaussian")
            .context("Invalid Gaussian sigma")?;
        NumericValidator::validate_positive(cli.batch_size, "--batch-size")
            .context("Invalid batch size")?;
        if let Some(workers) = cli.workers {
            NumericValidator::validate_worker_count(workers).context("Invalid worker count")?;
        }

        if !cli.check_border {
            if cli.copy_failed {
                warn!("--copy-failed has no effect without --check-border");
            }
            if cli.failed_dir.is_some() {
                warn!("--failed-dir has no effect without --check-border");
            }
        }
        if cli.border_test == CliBorderTest::BorderRegion && cli.border_sides != 3 {
            warn!("--border-sides is ignored by the border-region test");
        }

        Ok(())
    }
}
