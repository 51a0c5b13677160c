//! I/O contract types for bundler communication.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::Sourcemap;

/// Everything the bundler needs for one build.
///
/// `entrypoints` is the complete ordered list for the run; the bundler is
/// invoked once per pipeline run with all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Absolute forward-slash entrypoint paths, in submission order.
    pub entrypoints: Vec<String>,
    pub minify: bool,
    pub sourcemap: Sourcemap,
    pub outdir: PathBuf,
    /// Output naming template.
    pub naming: String,
    /// Project root, used as the bundler's working directory.
    pub root: PathBuf,
}

/// What a bundler output is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputKind {
    EntryPoint,
    Chunk,
    Asset,
    Sourcemap,
}

impl OutputKind {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("entry-point" | "entry_point" | "entrypoint") => OutputKind::EntryPoint,
            Some("chunk") => OutputKind::Chunk,
            Some("sourcemap" | "source-map") => OutputKind::Sourcemap,
            _ => OutputKind::Asset,
        }
    }
}

/// How the bundler loaded the source of an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loader {
    Html,
    File,
    Script,
    Style,
}

impl Loader {
    fn parse(raw: Option<&str>, path: &Path) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("html") => Loader::Html,
            Some("css" | "style") => Loader::Style,
            Some("js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "mts" | "cts" | "script") => {
                Loader::Script
            }
            Some("file" | "asset" | "text" | "json" | "toml" | "wasm" | "napi") => Loader::File,
            _ => Self::from_extension(path),
        }
    }

    fn from_extension(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("html" | "htm") => Loader::Html,
            Some("css") => Loader::Style,
            Some("js" | "mjs" | "cjs") => Loader::Script,
            _ => Loader::File,
        }
    }
}

/// One emitted artifact, normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    /// Absolute output path.
    pub path: PathBuf,
    pub kind: OutputKind,
    pub loader: Loader,
}

impl OutputRecord {
    /// Creates a record.
    pub fn new(path: impl Into<PathBuf>, kind: OutputKind, loader: Loader) -> Self {
        Self {
            path: path.into(),
            kind,
            loader,
        }
    }

    /// Creates an entry-point record for a bundled script.
    pub fn script(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::EntryPoint, Loader::Script)
    }

    /// Creates an entry-point record for a bundled stylesheet.
    pub fn style(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::EntryPoint, Loader::Style)
    }

    /// Creates an entry-point record for an emitted HTML document.
    pub fn html(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::EntryPoint, Loader::Html)
    }

    /// Creates an entry-point record for a copied file (icons, images).
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::EntryPoint, Loader::File)
    }

    /// Creates the `.js` entry point a file loader emits in front of a copied file.
    pub fn file_wrapper(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::EntryPoint, Loader::File)
    }

    /// Creates an asset record for a copied file.
    pub fn file_asset(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::Asset, Loader::File)
    }

    /// Creates a chunk record.
    pub fn chunk(path: impl Into<PathBuf>) -> Self {
        Self::new(path, OutputKind::Chunk, Loader::Script)
    }

    /// Returns true if a manifest field may point at this record directly.
    ///
    /// Chunks, assets and source maps are only reachable through other
    /// outputs. Scripts the bundler derived from an HTML document belong to
    /// that document, not to a manifest field.
    pub fn is_addressable(&self) -> bool {
        match self.kind {
            OutputKind::EntryPoint => !(self.loader == Loader::Html && !self.is_html_document()),
            OutputKind::Chunk | OutputKind::Asset | OutputKind::Sourcemap => false,
        }
    }

    /// Returns true for a file-loader entry point that only re-exports the
    /// URL of a copied file (`16.js` standing in for `16-a1b2c3d4.png`).
    pub fn is_file_wrapper(&self) -> bool {
        self.kind == OutputKind::EntryPoint
            && self.loader == Loader::File
            && matches!(
                self.path.extension().and_then(|e| e.to_str()),
                Some("js" | "mjs" | "cjs")
            )
    }

    /// Returns true for a file copied as an asset.
    pub fn is_file_asset(&self) -> bool {
        self.kind == OutputKind::Asset && self.loader == Loader::File
    }

    /// Returns true if the record is an HTML document.
    pub fn is_html_document(&self) -> bool {
        matches!(
            self.path.extension().and_then(|e| e.to_str()),
            Some("html" | "htm")
        )
    }
}

/// A diagnostic emitted by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLog {
    #[serde(default = "default_level")]
    pub level: String,
    pub message: String,
}

fn default_level() -> String {
    "error".to_string()
}

impl BuildLog {
    /// Creates a log entry.
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for BuildLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Normalized bundler result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuildResult {
    pub success: bool,
    /// Outputs in the order the bundler reported them.
    pub outputs: Vec<OutputRecord>,
    pub logs: Vec<BuildLog>,
}

impl BuildResult {
    /// Creates a successful result.
    pub fn success(outputs: Vec<OutputRecord>) -> Self {
        Self {
            success: true,
            outputs,
            logs: Vec::new(),
        }
    }

    /// Creates a failed result.
    pub fn failure(logs: Vec<BuildLog>) -> Self {
        Self {
            success: false,
            outputs: Vec::new(),
            logs,
        }
    }
}

/// Result JSON as printed by a bundler process.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBuildResult {
    pub success: bool,
    #[serde(default)]
    pub outputs: Vec<RawOutput>,
    #[serde(default)]
    pub logs: Vec<BuildLog>,
}

/// One output entry as printed by a bundler process.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOutput {
    pub path: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub loader: Option<String>,
}

impl RawBuildResult {
    /// Normalizes paths against `outdir` and classifies every record.
    pub fn normalize(self, outdir: &Path) -> BuildResult {
        let outputs = self
            .outputs
            .into_iter()
            .map(|raw| {
                let path = PathBuf::from(&raw.path);
                let path = if path.is_absolute() {
                    path
                } else {
                    outdir.join(path)
                };
                let path = extpack_manifest::paths::normalize(&path);
                let loader = Loader::parse(raw.loader.as_deref(), &path);
                OutputRecord {
                    kind: OutputKind::parse(raw.kind.as_deref()),
                    loader,
                    path,
                }
            })
            .collect();

        BuildResult {
            success: self.success,
            outputs,
            logs: self.logs,
        }
    }
}
