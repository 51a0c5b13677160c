//! Error types for manifest operations.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The manifest source file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path of the manifest source file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest source file is not valid JSON.
    #[error("invalid manifest {path}: {source}")]
    Parse {
        /// Path of the manifest source file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}
