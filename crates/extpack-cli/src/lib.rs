//! extpack CLI library.
//!
//! This crate provides the build pipeline behind the `extpack` binary:
//! configuration, the bundler adapter, HTML scanning, output reconciliation,
//! static asset copying, manifest writing and the live-reload dev session.

pub mod assets;
pub mod bundler;
pub mod commands;
pub mod config;
pub mod dev;
pub mod html;
pub mod logging;
pub mod pipeline;
pub mod reconcile;
pub mod status;
pub mod writer;

pub use config::{Config, ConfigOverrides};
pub use pipeline::{clean_outdir, Pipeline, PipelineError, PipelineReport};
