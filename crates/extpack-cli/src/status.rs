//! Human-readable status lines.
//!
//! Structured diagnostics go through `tracing`; these are the colored lines
//! an operator actually reads.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::config::Config;
use crate::pipeline::PipelineReport;

/// Prints the build header.
pub fn print_build_start(config: &Config) {
    println!("{} {}", "Building:".cyan().bold(), config.manifest.display());
    println!("{} {}", "Output directory:".cyan().bold(), config.outdir.display());
    if !config.minify {
        println!("{} {}", "Minify:".dimmed(), "disabled".yellow());
    }
}

/// Prints the outcome of one pipeline run.
pub fn print_report(report: &PipelineReport) {
    if !report.diagnostics.is_empty() {
        println!("\n{}", "Bundler:".yellow().bold());
        for log in &report.diagnostics {
            println!("  {} [{}]: {}", "!".yellow(), log.level.yellow(), log.message);
        }
    }

    if !report.mismatches.is_empty() {
        println!("\n{}", "Unresolved references:".yellow().bold());
        for mismatch in &report.mismatches {
            println!("  {} {}", "!".yellow(), mismatch);
        }
    }

    if !report.warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for warning in &report.warnings {
            println!("  {} {}", "!".yellow(), warning);
        }
    }

    if !report.bundler_ok() {
        println!(
            "\n{} Bundler reported failure; {} written with unresolved paths",
            "FAILED".red().bold(),
            report.manifest_path.display()
        );
        return;
    }

    println!(
        "\n{} Bundled {} entrypoint(s), copied {} static file(s)",
        "SUCCESS".green().bold(),
        report.entrypoints.len(),
        report.copied_assets
    );
    println!(
        "{} {}",
        "Manifest written to:".dimmed(),
        report.manifest_path.display()
    );
}

/// Prints the elapsed time of a one-shot build.
pub fn print_elapsed(elapsed: Duration) {
    println!("{} {}ms", "Done in".dimmed(), elapsed.as_millis());
}

pub fn print_watching(root: &Path, addr: SocketAddr) {
    println!(
        "\n{} {} {}",
        "Watching".cyan().bold(),
        root.display(),
        "for changes".dimmed()
    );
    println!("{} ws://{}", "Reload server:".cyan().bold(), addr);
    println!("{}", "Press Ctrl+C to stop".dimmed());
}

pub fn print_rebuilding() {
    println!("\n{}", "Change detected, rebuilding...".dimmed());
}

pub fn print_error(error: &anyhow::Error) {
    println!("\n{} {:#}", "BUILD FAILED".red().bold(), error);
}

pub fn print_closed() {
    println!("\n{}", "Dev session closed".dimmed());
}
