//! Build configuration.
//!
//! A [`Config`] is assembled from built-in defaults, an optional
//! `extpack.config.json` in the project root and command-line overrides, in
//! that order. Once resolved it is immutable for the duration of a pipeline
//! run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use extpack_manifest::paths::normalize;

/// Name of the optional config file in the project root.
pub const CONFIG_FILE_NAME: &str = "extpack.config.json";

/// Source map emission mode passed through to the bundler.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum Sourcemap {
    #[default]
    None,
    Inline,
    Linked,
    External,
}

impl Sourcemap {
    /// Returns the mode as the bundler spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sourcemap::None => "none",
            Sourcemap::Inline => "inline",
            Sourcemap::Linked => "linked",
            Sourcemap::External => "external",
        }
    }
}

impl std::fmt::Display for Sourcemap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Project root; every relative path below resolves against it.
    #[serde(skip)]
    pub root: PathBuf,
    /// Minify bundled output.
    pub minify: bool,
    /// Source map mode.
    pub sourcemap: Sourcemap,
    /// Output directory.
    pub outdir: PathBuf,
    /// Static directory mirrored into the output directory.
    pub public_dir: PathBuf,
    /// Manifest source file.
    pub manifest: PathBuf,
    /// Bundler command line. `{driver}`, `{request}` and `{outdir}` are substituted.
    pub bundler: Vec<String>,
    /// Output naming template handed to the bundler.
    pub naming: String,
    /// Exit non-zero from a one-shot build when the bundler reports failure.
    pub fail_on_bundler_error: bool,
    /// Debounce window for dev-mode rebuilds, in milliseconds.
    pub debounce_ms: u64,
    /// Bundler timeout, in seconds.
    pub bundler_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            minify: true,
            sourcemap: Sourcemap::None,
            outdir: PathBuf::from("dist"),
            public_dir: PathBuf::from("public"),
            manifest: PathBuf::from("manifest.json"),
            bundler: vec!["bun".to_string(), "{driver}".to_string()],
            naming: "[dir]/[name].[ext]".to_string(),
            fail_on_bundler_error: false,
            debounce_ms: 100,
            bundler_timeout_secs: 300,
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub outdir: Option<PathBuf>,
    pub public_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub no_minify: bool,
    pub sourcemap: Option<Sourcemap>,
    pub bundler: Option<Vec<String>>,
    pub fail_on_bundler_error: bool,
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("bundler command is empty")]
    EmptyBundler,
}

impl Config {
    /// Loads the configuration for `root`.
    ///
    /// `config_file` defaults to `extpack.config.json` in `root`; a missing
    /// default file is not an error, a missing explicit one is.
    pub fn load(
        root: &Path,
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let (path, required) = match config_file {
            Some(path) => (root.join(path), true),
            None => (root.join(CONFIG_FILE_NAME), false),
        };

        let mut config = if path.exists() || required {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            Self::from_json(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            Self::default()
        };

        config.apply(overrides);
        if config.bundler.is_empty() {
            return Err(ConfigError::EmptyBundler);
        }
        Ok(config.resolved(root))
    }

    /// Parses a config from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Applies command-line overrides.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(outdir) = &overrides.outdir {
            self.outdir = outdir.clone();
        }
        if let Some(public_dir) = &overrides.public_dir {
            self.public_dir = public_dir.clone();
        }
        if let Some(manifest) = &overrides.manifest {
            self.manifest = manifest.clone();
        }
        if overrides.no_minify {
            self.minify = false;
        }
        if let Some(sourcemap) = overrides.sourcemap {
            self.sourcemap = sourcemap;
        }
        if let Some(bundler) = &overrides.bundler {
            self.bundler = bundler.clone();
        }
        if overrides.fail_on_bundler_error {
            self.fail_on_bundler_error = true;
        }
    }

    /// Makes every path absolute against `root`.
    pub fn resolved(mut self, root: &Path) -> Self {
        let root = normalize(root);
        self.outdir = normalize(&root.join(&self.outdir));
        self.public_dir = normalize(&root.join(&self.public_dir));
        self.manifest = normalize(&root.join(&self.manifest));
        self.root = root;
        self
    }

    /// Path of the generated `manifest.json`.
    pub fn output_manifest(&self) -> PathBuf {
        self.outdir.join("manifest.json")
    }
}
