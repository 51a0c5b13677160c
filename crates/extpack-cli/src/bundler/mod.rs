//! Bundler adapter.
//!
//! The bundler is an external collaborator. This module defines the seam
//! ([`Bundler`]), the request/result contract, and a subprocess
//! implementation that talks to any executable honouring the contract.
//!
//! # Subprocess Protocol
//!
//! 1. extpack writes the [`BuildRequest`] as JSON to a temporary file
//! 2. The configured command is spawned with `--request <path>` appended
//!    (unless the command already uses the `{request}` placeholder)
//! 3. The bundler writes its artifacts into `outdir`
//! 4. The bundler prints a result object on stdout:
//!    - `success`: bool
//!    - `outputs`: ordered list of `{ path, kind, loader }`
//!    - `logs`: list of `{ level, message }`
//! 5. A non-zero exit code is a bundler failure
//!
//! The default command runs an embedded Bun driver script (`{driver}`).

mod contract;
mod subprocess;

pub use contract::{
    BuildLog, BuildRequest, BuildResult, Loader, OutputKind, OutputRecord, RawBuildResult,
    RawOutput,
};
pub use subprocess::{SubprocessBundler, SubprocessConfig, DRIVER_SOURCE};

use thiserror::Error;


/// An external bundler.
///
/// Implementations are invoked exactly once per pipeline run with the full
/// entrypoint list, and must report outputs in an order that allows
/// entrypoint-by-entrypoint consumption.
pub trait Bundler {
    fn build(&self, request: &BuildRequest) -> Result<BuildResult, BundlerError>;
}

impl<B: Bundler + ?Sized> Bundler for &B {
    fn build(&self, request: &BuildRequest) -> Result<BuildResult, BundlerError> {
        (**self).build(request)
    }
}

impl<B: Bundler + ?Sized> Bundler for Box<B> {
    fn build(&self, request: &BuildRequest) -> Result<BuildResult, BundlerError> {
        (**self).build(request)
    }
}

/// Errors that can occur while invoking the bundler.
#[derive(Debug, Error)]
pub enum BundlerError {
    /// The request could not be prepared.
    #[error("failed to prepare bundler request: {0}")]
    Prepare(String),

    /// The bundler process failed to start.
    #[error("failed to spawn bundler: {0}")]
    SpawnFailed(String),

    /// The bundler timed out.
    #[error("bundler timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// The bundler exited with a non-zero code.
    #[error("bundler exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    /// The bundler printed something that is not a result object.
    #[error("invalid bundler result: {0}")]
    InvalidResult(String),
}
