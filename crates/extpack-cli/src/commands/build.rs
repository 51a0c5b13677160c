//! One-shot build command
//!
//! Cleans the output directory and runs the pipeline once.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::time::Instant;

use extpack_manifest::Manifest;

use super::{subprocess_bundler, CommandOptions};
use crate::pipeline::{clean_outdir, Pipeline};
use crate::status;

/// Run the build command
///
/// # Returns
/// Exit code: 0 success, 1 when `failOnBundlerError` is set and the bundler
/// reported failure
pub fn run(options: &CommandOptions) -> Result<ExitCode> {
    let start = Instant::now();
    let config = options.load_config()?;

    status::print_build_start(&config);

    clean_outdir(&config)?;

    let mut manifest = Manifest::load(&config.manifest)
        .with_context(|| format!("Failed to load manifest {}", config.manifest.display()))?;

    let bundler = subprocess_bundler(&config);
    let report = Pipeline::new(&config, &bundler).run(&mut manifest)?;

    status::print_report(&report);
    status::print_elapsed(start.elapsed());

    if config.fail_on_bundler_error && !report.bundler_ok() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
