//! Reference extraction.
//!
//! Walks the path-valued fields of a [`Manifest`] in their fixed precedence,
//! rewrites each to an absolute forward-slash path and returns one
//! [`Reference`] per occurrence. The returned order is the order in which
//! entrypoints are submitted to the bundler, so it must never change between
//! two runs over the same manifest.

use std::path::Path;

use crate::field::FieldId;
use crate::manifest::Manifest;
use crate::paths::{has_file_extension, is_external, posix_path, resolve_against};


/// A source file referenced from one manifest field.
///
/// Several references may share a `source_path`; each keeps its own owner
/// because the rewrite step updates owners independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Absolute forward-slash source path.
    pub source_path: String,
    /// The manifest field this reference was read from.
    pub owner: FieldId,
    /// Position in the extraction order.
    pub position: usize,
}

impl Reference {
    /// Returns true if the owning field holds an HTML document.
    pub fn is_html(&self) -> bool {
        self.owner.is_html()
    }
}

/// Extracts every path-valued field of `manifest`, resolving against `root`.
///
/// As a side effect each extracted field is overwritten with its absolute
/// form and every content script's `ts` list is renamed to `js`. Values
/// without a file extension and external URLs are left alone. Running the
/// extraction again over its own output yields the same paths.
pub fn extract_references(manifest: &mut Manifest, root: &Path) -> Vec<Reference> {
    manifest.rename_script_fields();

    let mut references = Vec::new();
    for field in manifest.path_fields() {
        let Some(value) = manifest.get(&field) else {
            continue;
        };
        if is_external(value) || !has_file_extension(value) {
            continue;
        }

        let resolved = posix_path(&resolve_against(root, value));
        manifest.set(&field, resolved.clone());
        references.push(Reference {
            source_path: resolved,
            owner: field,
            position: references.len(),
        });
    }

    references
}
