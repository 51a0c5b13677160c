//! extpack Manifest Library
//!
//! This crate provides the in-memory model of a browser extension manifest,
//! the typed identifiers of its path-valued fields, the reference extractor
//! that turns those fields into an ordered entrypoint list, and the path
//! registry used to map source files to their emitted artifacts.
//!
//! # Overview
//!
//! A build starts from a declarative manifest whose path-valued fields point
//! at source files:
//!
//! - **Service worker**: `background.service_worker`
//! - **Content scripts**: `content_scripts[].ts` / `.js` / `.css`
//! - **Pages**: `action.default_popup`, `options_page`, `options_ui.page`
//! - **Icons**: `icons.*`, `action.default_icon.*`
//!
//! The extractor walks those fields in a fixed precedence, rewrites each to
//! its absolute form and returns one [`Reference`] per occurrence. Later
//! stages consume bundler outputs positionally against that list.
//!
//! # Example
//!
//! ```
//! use extpack_manifest::{extract_references, FieldId, Manifest};
//! use std::path::Path;
//!
//! let mut manifest = Manifest::from_json(
//!     r#"{"name": "demo", "background": {"service_worker": "src/bg.ts"}}"#,
//! ).unwrap();
//!
//! let references = extract_references(&mut manifest, Path::new("/project"));
//! assert_eq!(references.len(), 1);
//! assert_eq!(references[0].owner, FieldId::ServiceWorker);
//! assert_eq!(references[0].source_path, "/project/src/bg.ts");
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error type for manifest loading
//! - [`field`]: Typed identifiers of path-valued manifest fields
//! - [`manifest`]: The manifest model
//! - [`extract`]: Reference extraction
//! - [`registry`]: Source path to output path registry
//! - [`paths`]: Forward-slash path helpers

pub mod error;
pub mod extract;
pub mod field;
pub mod manifest;
pub mod paths;
pub mod registry;

// Re-export commonly used types at the crate root
pub use error::ManifestError;
pub use extract::{extract_references, Reference};
pub use field::FieldId;
pub use manifest::{
    Action, Background, ContentScript, IconSet, Manifest, OptionsUi, DEFAULT_MANIFEST_VERSION,
    MODULE_WORKER_TYPE,
};
pub use registry::PathRegistry;
