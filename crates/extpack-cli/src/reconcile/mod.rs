//! Output reconciliation.
//!
//! Bundler outputs come back as one ordered list. The reconciler walks the
//! submitted references in the same order and hands each the next
//! addressable output, so the field that submitted `A` gets `A'` and never
//! the output of a neighbour.
//!
//! # Policies
//!
//! - A source path resolved earlier in the run reuses its registry entry.
//!   When the bundler answered every submission with its own record, each
//!   repeat consumes its own slot; when it collapsed repeats, only a record
//!   repeating the first output is consumed.
//! - A file-loader entry point (`16.js`) stands in for a copied file. A
//!   non-script reference resolves through it to the asset it re-exports.
//! - Chunks, assets, source maps and scripts the bundler derived from HTML
//!   are never handed to a reference.
//! - The next addressable output must be in the reference's output family
//!   (`.js` for scripts, `.css` for styles, `.html` for pages, otherwise the
//!   source extension). A mismatch or an exhausted queue leaves the field
//!   unresolved and is reported as a [`Mismatch`].
//! - Icon outputs lose their content hash (`16-a1b2c3d4.png` becomes
//!   `16.png`) and are renamed on disk.
//! - HTML documents get their script and stylesheet attributes rewritten to
//!   the bundled outputs, relative to the document's output directory.

mod cursor;
mod icons;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use extpack_manifest::paths::{normalize, posix_path, relative_posix};
use extpack_manifest::{FieldId, Manifest, PathRegistry, Reference};

use regex::Regex;

use crate::bundler::OutputRecord;
use crate::html::HtmlDescriptor;

use cursor::OutputCursor;
pub use icons::strip_content_hash;

/// Who asked for a reference to be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// A manifest field.
    Field(FieldId),
    /// A `<script>` or `<link>` inside an HTML document.
    Document(String),
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Field(field) => write!(f, "{}", field),
            Owner::Document(path) => write!(f, "{}", path),
        }
    }
}

/// A reference that could not be matched to an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The output queue ran out.
    Exhausted {
        owner: Owner,
        source: String,
        /// Outputs left in the queue (none of them addressable).
        remaining: Vec<String>,
    },
    /// The next addressable output belongs to a different family.
    Family {
        owner: Owner,
        source: String,
        expected: String,
        found: String,
    },
}

impl Mismatch {
    /// The owner left unresolved.
    pub fn owner(&self) -> &Owner {
        match self {
            Mismatch::Exhausted { owner, .. } | Mismatch::Family { owner, .. } => owner,
        }
    }

    /// The source path left unresolved.
    pub fn source(&self) -> &str {
        match self {
            Mismatch::Exhausted { source, .. } | Mismatch::Family { source, .. } => source,
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Exhausted {
                owner,
                source,
                remaining,
            } => write!(
                f,
                "no output left for {} ({}); remaining outputs: [{}]",
                owner,
                source,
                remaining.join(", ")
            ),
            Mismatch::Family {
                owner,
                source,
                expected,
                found,
            } => write!(
                f,
                "expected a .{} output for {} ({}), found {}",
                expected, owner, source, found
            ),
        }
    }
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Number of references that received an output path.
    pub resolved: usize,
    /// References left unresolved.
    pub mismatches: Vec<Mismatch>,
    /// HTML documents written to the output directory.
    pub documents: Vec<PathBuf>,
    /// Non-fatal problems (failed renames, unwritable documents).
    pub warnings: Vec<String>,
}

/// Matches bundler outputs back to the references that produced them.
pub struct Reconciler<'a> {
    root: &'a Path,
    outdir: &'a Path,
    registry: &'a mut PathRegistry,
    cursor: OutputCursor<'a>,
    /// Source path to the absolute output it consumed.
    emitted: HashMap<String, PathBuf>,
    /// Output slots each source still owns, one per submission.
    slots: HashMap<String, usize>,
    /// Whether the bundler answered every submission with its own record.
    per_submission: bool,
    report: Reconciliation,
}

impl<'a> Reconciler<'a> {
    /// Creates a reconciler over `outputs`, in the order the bundler reported them.
    pub fn new(
        root: &'a Path,
        outdir: &'a Path,
        registry: &'a mut PathRegistry,
        outputs: &'a [OutputRecord],
    ) -> Self {
        Self {
            root,
            outdir,
            registry,
            cursor: OutputCursor::new(outputs),
            emitted: HashMap::new(),
            slots: HashMap::new(),
            per_submission: false,
            report: Reconciliation::default(),
        }
    }

    /// Records the entrypoints the outputs were built from, in submission
    /// order, so repeated sources can claim their own output slots.
    pub fn with_entrypoints(mut self, entrypoints: &[String]) -> Self {
        for entrypoint in entrypoints {
            *self.slots.entry(entrypoint.clone()).or_default() += 1;
        }
        self.per_submission =
            !entrypoints.is_empty() && self.cursor.addressable_len() >= entrypoints.len();
        self
    }

    /// Reconciles primary references, then every HTML document.
    ///
    /// `references` and `documents` must be in the order their entrypoints
    /// were submitted.
    pub fn run(
        mut self,
        manifest: &mut Manifest,
        references: &[Reference],
        documents: &[HtmlDescriptor],
    ) -> Reconciliation {
        for reference in references {
            let owner = Owner::Field(reference.owner.clone());
            if let Some(output) =
                self.resolve(&owner, &reference.source_path, reference.owner.is_icon())
            {
                manifest.set(&reference.owner, output);
            }
        }

        for document in documents {
            self.patch_document(manifest, document);
        }

        let unclaimed = self.cursor.remaining();
        if !unclaimed.is_empty() {
            tracing::debug!(outputs = ?unclaimed, "unclaimed bundler outputs");
        }

        self.report
    }

    /// Resolves one source path, returning its output-relative path.
    fn resolve(&mut self, owner: &Owner, source: &str, is_icon: bool) -> Option<String> {
        if let Some(existing) = self.registry.get(source).map(str::to_string) {
            if self.emitted.contains_key(source) {
                self.consume_duplicate_slot(source);
            }
            tracing::debug!(%owner, source, output = %existing, "reused resolved output");
            self.report.resolved += 1;
            return Some(existing);
        }

        let Some(record) = self.cursor.peek() else {
            let mismatch = Mismatch::Exhausted {
                owner: owner.clone(),
                source: source.to_string(),
                remaining: self.cursor.remaining(),
            };
            self.mismatch(mismatch);
            return None;
        };

        let expected = output_family(source);
        let wrapped = expected != "js" && record.is_file_wrapper();
        let found = if wrapped {
            self.claim_wrapped_file(record, &expected)
                .map(|asset| asset.path.clone())
        } else {
            family_matches(&expected, &record.path).then(|| record.path.clone())
        };
        let Some(mut path) = found else {
            let mismatch = Mismatch::Family {
                owner: owner.clone(),
                source: source.to_string(),
                expected,
                found: posix_path(&record.path),
            };
            self.mismatch(mismatch);
            return None;
        };

        self.take_slot(source);
        self.emitted.insert(source.to_string(), path.clone());

        if is_icon || wrapped {
            path = self.unhash_icon(path);
        }

        let relative = relative_posix(self.outdir, &path);
        tracing::debug!(%owner, source, output = %relative, "resolved output");
        self.report.resolved += 1;
        Some(self.registry.insert(source, relative).to_string())
    }

    /// Moves past the record at the cursor, counting it against `source`.
    fn take_slot(&mut self, source: &str) {
        self.cursor.advance();
        if let Some(slots) = self.slots.get_mut(source) {
            *slots = slots.saturating_sub(1);
        }
    }

    /// Consumes the output slot of a repeated source, if it has one.
    ///
    /// A bundler that answered every submission gets one record consumed per
    /// occurrence, as long as the source has unanswered submissions and the
    /// record is in its family. A bundler that collapsed repeats only gets a
    /// record consumed when it repeats the first occurrence's output.
    fn consume_duplicate_slot(&mut self, source: &str) {
        let Some(next) = self.cursor.peek() else {
            return;
        };

        let own_slot = if self.per_submission {
            let expected = output_family(source);
            if !self.slots.get(source).is_some_and(|slots| *slots > 0) {
                false
            } else if expected != "js" && next.is_file_wrapper() {
                self.claim_wrapped_file(next, &expected).is_some()
            } else {
                family_matches(&expected, &next.path)
            }
        } else {
            self.emitted.get(source) == Some(&next.path)
        };

        if own_slot {
            tracing::debug!(source, output = %posix_path(&next.path), "consumed duplicate slot");
            self.take_slot(source);
        }
    }

    /// Finds the copied file behind a file-loader wrapper.
    ///
    /// The wrapper's default export names the file; when it cannot be read
    /// the next unclaimed file asset of the expected family is used.
    fn claim_wrapped_file(
        &mut self,
        wrapper: &OutputRecord,
        expected: &str,
    ) -> Option<&'a OutputRecord> {
        if let Some(target) = wrapped_file_target(&wrapper.path) {
            if let Some(asset) = self.cursor.claim_companion(|asset| asset.path == target) {
                return Some(asset);
            }
        }
        self.cursor
            .claim_companion(|asset| family_matches(expected, &asset.path))
    }

    fn mismatch(&mut self, mismatch: Mismatch) {
        tracing::warn!("{}", mismatch);
        self.report.mismatches.push(mismatch);
    }

    fn unhash_icon(&mut self, path: PathBuf) -> PathBuf {
        let Some(stable) = strip_content_hash(&path) else {
            return path;
        };
        match std::fs::rename(&path, &stable) {
            Ok(()) => stable,
            // Nothing on disk to rename; the bundler result is still trusted
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => stable,
            Err(e) => {
                let warning = format!(
                    "failed to rename icon {} to {}: {}",
                    path.display(),
                    stable.display(),
                    e
                );
                tracing::warn!("{}", warning);
                self.report.warnings.push(warning);
                path
            }
        }
    }

    /// Resolves a document's own references and writes the patched document.
    fn patch_document(&mut self, manifest: &mut Manifest, document: &HtmlDescriptor) {
        let owner = Owner::Document(document.document_path.clone());
        let mut replacements = Vec::new();
        for (raw, resolved) in document.references() {
            if let Some(output) = self.resolve(&owner, resolved, false) {
                replacements.push((raw.to_string(), self.outdir.join(output)));
            }
        }

        let output_path = match self.registry.get(&document.document_path).map(str::to_string) {
            Some(relative) => self.outdir.join(relative),
            None => {
                // The bundler emitted no page; ship the source document
                let output_path = self.outdir.join(self.document_fallback(document));
                let relative = relative_posix(self.outdir, &output_path);
                self.registry.insert(&document.document_path, relative.clone());
                manifest.set(&document.owner, relative);
                output_path
            }
        };

        let html = std::fs::read_to_string(&output_path)
            .or_else(|_| std::fs::read_to_string(&document.document_path));
        let html = match html {
            Ok(html) => html,
            Err(e) => {
                self.warn(format!(
                    "failed to read html document {}: {}",
                    document.document_path, e
                ));
                return;
            }
        };

        let output_dir = output_path.parent().unwrap_or(self.outdir);
        let patched = replacements.iter().fold(html, |html, (raw, target)| {
            replace_attribute(&html, raw, &relative_posix(output_dir, target))
        });

        let written =
            std::fs::create_dir_all(output_dir).and_then(|()| std::fs::write(&output_path, patched));
        match written {
            Ok(()) => {
                tracing::debug!(document = %output_path.display(), "wrote html document");
                if !self.report.documents.contains(&output_path) {
                    self.report.documents.push(output_path);
                }
            }
            Err(e) => self.warn(format!(
                "failed to write html document {}: {}",
                output_path.display(),
                e
            )),
        }
    }

    /// Output location for a document the bundler did not emit.
    fn document_fallback(&self, document: &HtmlDescriptor) -> PathBuf {
        let source = Path::new(&document.document_path);
        match source.strip_prefix(self.root) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) => source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("index.html")),
        }
    }

    fn warn(&mut self, warning: String) {
        tracing::warn!("{}", warning);
        self.report.warnings.push(warning);
    }
}

/// Replaces every quoted occurrence of `raw` with `replacement`.
///
/// Only whole attribute values match: `"app.ts"` is rewritten, `"my-app.ts"`
/// is not.
pub fn replace_attribute(html: &str, raw: &str, replacement: &str) -> String {
    html.replace(&format!("\"{}\"", raw), &format!("\"{}\"", replacement))
        .replace(&format!("'{}'", raw), &format!("'{}'", replacement))
}

/// Extension family of the output a source file is bundled into.
pub fn output_family(source: &str) -> String {
    let extension = Path::new(source)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" | "mts" | "cts" => "js".to_string(),
        "css" | "scss" | "sass" | "less" => "css".to_string(),
        "html" | "htm" => "html".to_string(),
        _ => extension,
    }
}

/// The file a file-loader wrapper re-exports, resolved against the wrapper's
/// directory.
fn wrapped_file_target(wrapper: &Path) -> Option<PathBuf> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"["']((?:\.{1,2}/)?[^"'\s]+\.[A-Za-z0-9]+)["']"#).expect("valid regex")
    });

    let source = std::fs::read_to_string(wrapper).ok()?;
    let target = pattern
        .captures_iter(&source)
        .map(|captures| captures[1].to_string())
        .filter(|value| !value.ends_with(".js"))
        .last()?;
    let directory = wrapper.parent()?;
    Some(normalize(&directory.join(target)))
}

fn family_matches(expected: &str, output: &Path) -> bool {
    let actual = output
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match expected {
        "html" => actual == "html" || actual == "htm",
        "js" => matches!(actual.as_str(), "js" | "mjs" | "cjs"),
        _ => actual == expected,
    }
}
