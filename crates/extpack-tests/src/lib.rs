//! extpack End-to-End Test Infrastructure
//!
//! This crate provides integration tests for the flows that cross module
//! boundaries:
//!
//! - Pipeline: manifest source -> bundler -> reconciled `manifest.json`
//! - HTML pages: discovered scripts bundled and patched back in
//! - Dev session: rebuild on change and `reload` over the socket
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p extpack-tests
//! ```
//!
//! None of the tests need a real bundler: [`bundler::ScriptedBundler`]
//! stands in for it in-process, and the subprocess tests use `sh`.

pub mod bundler;
pub mod fixtures;

pub use bundler::ScriptedBundler;
pub use fixtures::{find_available_port, ProjectFixture};
