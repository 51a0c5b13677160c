//! HTML reference scanning.
//!
//! Pages named by the manifest (popup, options page, options UI page) load
//! their own scripts and stylesheets. Those are bundled as secondary
//! entrypoints, submitted after every primary reference, and the document is
//! patched once their outputs are known.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use extpack_manifest::paths::{is_external, posix_path, resolve_against};
use extpack_manifest::{FieldId, Reference};


/// Script and stylesheet references found in one HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDescriptor {
    /// Absolute forward-slash path of the source document.
    pub document_path: String,
    /// The manifest field that names the document.
    pub owner: FieldId,
    /// Attribute values exactly as written, in document order.
    pub raw_references: Vec<String>,
    /// Absolute forward-slash paths, parallel to `raw_references`.
    pub resolved_references: Vec<String>,
}

impl HtmlDescriptor {
    /// Scans `html` as the document at `document_path`.
    pub fn from_source(document_path: &str, owner: FieldId, html: &str) -> Self {
        let base = Path::new(document_path)
            .parent()
            .unwrap_or_else(|| Path::new("/"));

        let mut raw_references: Vec<String> = Vec::new();
        let mut resolved_references = Vec::new();
        for raw in scan_tags(html) {
            if raw_references.contains(&raw) {
                continue;
            }
            resolved_references.push(posix_path(&resolve_against(base, &raw)));
            raw_references.push(raw);
        }

        Self {
            document_path: document_path.to_string(),
            owner,
            raw_references,
            resolved_references,
        }
    }

    /// Pairs of `(raw, resolved)` references.
    pub fn references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw_references
            .iter()
            .map(String::as_str)
            .zip(self.resolved_references.iter().map(String::as_str))
    }

    /// Returns true if the document loads nothing local.
    pub fn is_empty(&self) -> bool {
        self.raw_references.is_empty()
    }
}

/// Scans every HTML-owned reference.
///
/// Produces one descriptor per HTML field, in reference order. A document
/// that cannot be read is logged and skipped; it is still bundled as a
/// primary entrypoint.
pub fn scan_documents(references: &[Reference]) -> Vec<HtmlDescriptor> {
    references
        .iter()
        .filter(|reference| reference.is_html())
        .filter_map(|reference| {
            match std::fs::read_to_string(&reference.source_path) {
                Ok(html) => {
                    let descriptor = HtmlDescriptor::from_source(
                        &reference.source_path,
                        reference.owner.clone(),
                        &html,
                    );
                    tracing::debug!(
                        document = %descriptor.document_path,
                        references = descriptor.raw_references.len(),
                        "scanned html document"
                    );
                    Some(descriptor)
                }
                Err(e) => {
                    tracing::warn!(
                        document = %reference.source_path,
                        owner = %reference.owner,
                        "failed to read html document: {}",
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Secondary entrypoints of all descriptors, in submission order.
pub fn secondary_entrypoints(documents: &[HtmlDescriptor]) -> Vec<String> {
    documents
        .iter()
        .flat_map(|d| d.resolved_references.iter().cloned())
        .collect()
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<(script|link)\b([^>]*)>").expect("valid regex")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)(?:^|\s)([a-z][a-z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("valid regex")
    })
}

/// Returns local `<script src>` and `<link rel=stylesheet href>` values in
/// document order.
fn scan_tags(html: &str) -> Vec<String> {
    let mut found = Vec::new();

    for tag in tag_pattern().captures_iter(html) {
        let name = tag[1].to_ascii_lowercase();
        let attributes = attributes(&tag[2]);
        let lookup = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let value = match name.as_str() {
            "script" => lookup("src"),
            "link" => {
                let is_stylesheet = lookup("rel").is_some_and(|rel| {
                    rel.split_whitespace()
                        .any(|token| token.eq_ignore_ascii_case("stylesheet"))
                });
                if is_stylesheet {
                    lookup("href")
                } else {
                    None
                }
            }
            _ => None,
        };

        if let Some(value) = value.map(str::trim) {
            if !value.is_empty() && !is_external(value) {
                found.push(value.to_string());
            }
        }
    }

    found
}

fn attributes(source: &str) -> Vec<(String, String)> {
    attribute_pattern()
        .captures_iter(source)
        .map(|cap| {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map_or("", |m| m.as_str());
            (cap[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}
