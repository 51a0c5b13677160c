//! The manifest build pipeline.
//!
//! One run takes a freshly loaded [`Manifest`] through every step in a fixed
//! order:
//!
//! 1. mark the service worker as an ES module
//! 2. copy the public directory and register its files
//! 3. extract path-valued fields into references
//! 4. resolve references to static files straight from the registry
//! 5. scan HTML pages for their own scripts and stylesheets
//! 6. invoke the bundler once with every remaining entrypoint
//! 7. reconcile outputs back into the manifest and the HTML pages
//! 8. write `manifest.json`
//!
//! Only creating the output directory and writing `manifest.json` can fail a
//! run. Everything else is recorded in the [`PipelineReport`] and logged.

use std::path::PathBuf;

use thiserror::Error;

use extpack_manifest::{extract_references, Manifest, PathRegistry, Reference};

use crate::assets::copy_static_assets;
use crate::bundler::{BuildLog, BuildRequest, BuildResult, Bundler};
use crate::config::Config;
use crate::html::{scan_documents, secondary_entrypoints};
use crate::reconcile::{Mismatch, Reconciler};
use crate::writer::write_manifest;


/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to create output directory {path}: {source}")]
    CreateOutdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clean output directory {path}: {source}")]
    CleanOutdir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to clean {outdir}: it contains the project root {root}")]
    UnsafeOutdir { outdir: PathBuf, root: PathBuf },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    WriteManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Entrypoints submitted to the bundler, in order.
    pub entrypoints: Vec<String>,
    /// Whether the bundler was invoked.
    pub bundler_invoked: bool,
    /// The bundler's verdict; `None` when it was not invoked.
    pub bundler_success: Option<bool>,
    /// Bundler diagnostics.
    pub diagnostics: Vec<BuildLog>,
    /// References left unresolved.
    pub mismatches: Vec<Mismatch>,
    /// Non-fatal problems outside the bundler.
    pub warnings: Vec<String>,
    /// Number of static files copied.
    pub copied_assets: usize,
    /// HTML pages written.
    pub documents: Vec<PathBuf>,
    /// The written `manifest.json`.
    pub manifest_path: PathBuf,
}

impl PipelineReport {
    /// Returns true unless the bundler reported failure.
    pub fn bundler_ok(&self) -> bool {
        self.bundler_success != Some(false)
    }

    /// Returns true if nothing at all went wrong.
    pub fn is_clean(&self) -> bool {
        self.bundler_ok() && self.mismatches.is_empty() && self.warnings.is_empty()
    }
}

/// Runs the build pipeline against one configuration and bundler.
pub struct Pipeline<'a, B> {
    config: &'a Config,
    bundler: B,
}

impl<'a, B: Bundler> Pipeline<'a, B> {
    /// Creates a pipeline.
    pub fn new(config: &'a Config, bundler: B) -> Self {
        Self { config, bundler }
    }

    /// Runs every step over `manifest`, leaving it in its written form.
    pub fn run(&self, manifest: &mut Manifest) -> Result<PipelineReport, PipelineError> {
        let config = self.config;
        let mut report = PipelineReport {
            manifest_path: config.output_manifest(),
            ..Default::default()
        };

        std::fs::create_dir_all(&config.outdir).map_err(|source| PipelineError::CreateOutdir {
            path: config.outdir.clone(),
            source,
        })?;

        manifest.mark_module_worker();

        let mut registry = PathRegistry::new();
        report.copied_assets =
            copy_static_assets(&config.public_dir, &config.outdir, &config.root, &mut registry)
                .len();

        let references = extract_references(manifest, &config.root);
        let pending = resolve_static(manifest, references, &registry);

        let documents = scan_documents(&pending);

        // Static files named by a page are linked, not bundled
        report.entrypoints = pending
            .iter()
            .map(|reference| reference.source_path.clone())
            .chain(
                secondary_entrypoints(&documents)
                    .into_iter()
                    .filter(|path| !registry.contains(path)),
            )
            .collect();

        let result = if report.entrypoints.is_empty() {
            tracing::debug!("no entrypoints; skipping bundler");
            BuildResult::success(Vec::new())
        } else {
            report.bundler_invoked = true;
            let result = self.bundle(&report.entrypoints);
            report.bundler_success = Some(result.success);
            result
        };
        for log in &result.logs {
            tracing::warn!(level = %log.level, "bundler: {}", log.message);
        }
        report.diagnostics = result.logs;

        let reconciliation = Reconciler::new(
            &config.root,
            &config.outdir,
            &mut registry,
            &result.outputs,
        )
        .with_entrypoints(&report.entrypoints)
        .run(manifest, &pending, &documents);
        report.mismatches = reconciliation.mismatches;
        report.warnings = reconciliation.warnings;
        report.documents = reconciliation.documents;

        write_manifest(manifest, &report.manifest_path)?;

        tracing::info!(
            entrypoints = report.entrypoints.len(),
            resolved = reconciliation.resolved,
            unresolved = report.mismatches.len(),
            "pipeline run complete"
        );
        Ok(report)
    }

    fn bundle(&self, entrypoints: &[String]) -> BuildResult {
        let request = BuildRequest {
            entrypoints: entrypoints.to_vec(),
            minify: self.config.minify,
            sourcemap: self.config.sourcemap,
            outdir: self.config.outdir.clone(),
            naming: self.config.naming.clone(),
            root: self.config.root.clone(),
        };

        tracing::debug!(entrypoints = ?request.entrypoints, "bundling");
        match self.bundler.build(&request) {
            Ok(result) => result,
            Err(e) => BuildResult::failure(vec![BuildLog::new("error", e.to_string())]),
        }
    }
}

/// Points references to already-registered files at their outputs and
/// returns the rest, which still need the bundler.
fn resolve_static(
    manifest: &mut Manifest,
    references: Vec<Reference>,
    registry: &PathRegistry,
) -> Vec<Reference> {
    references
        .into_iter()
        .filter(|reference| match registry.get(&reference.source_path) {
            Some(output) => {
                tracing::debug!(
                    owner = %reference.owner,
                    output,
                    "resolved static reference"
                );
                manifest.set(&reference.owner, output);
                false
            }
            None => true,
        })
        .collect()
}

/// Removes the output directory before a one-shot build.
///
/// Refuses when the output directory is the project root or one of its
/// ancestors.
pub fn clean_outdir(config: &Config) -> Result<(), PipelineError> {
    if config.root.starts_with(&config.outdir) {
        return Err(PipelineError::UnsafeOutdir {
            outdir: config.outdir.clone(),
            root: config.root.clone(),
        });
    }
    if !config.outdir.exists() {
        return Ok(());
    }

    tracing::debug!(path = %config.outdir.display(), "cleaning output directory");
    std::fs::remove_dir_all(&config.outdir).map_err(|source| PipelineError::CleanOutdir {
        path: config.outdir.clone(),
        source,
    })
}
