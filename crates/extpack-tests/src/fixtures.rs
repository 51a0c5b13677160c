//! Project fixtures: scratch extension trees on disk.

use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use extpack_cli::bundler::Bundler;
use extpack_cli::config::Config;
use extpack_cli::pipeline::{Pipeline, PipelineReport};
use extpack_manifest::Manifest;

/// A temporary extension project.
pub struct ProjectFixture {
    pub root: TempDir,
}

impl ProjectFixture {
    /// Create a new empty project.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        Self { root }
    }

    /// Get the project root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Write a file relative to the project root, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path().join(relative);
        fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("Failed to create parent dir");
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Write the manifest source (`manifest.json`).
    pub fn write_manifest(&self, manifest: serde_json::Value) -> PathBuf {
        self.write(
            "manifest.json",
            &serde_json::to_string_pretty(&manifest).expect("Failed to serialize manifest"),
        )
    }

    /// Default configuration resolved against this project.
    pub fn config(&self) -> Config {
        Config::default().resolved(self.path())
    }

    /// Load the manifest source and run the pipeline once.
    pub fn build<B: Bundler>(&self, config: &Config, bundler: B) -> PipelineReport {
        let mut manifest = Manifest::load(&config.manifest).expect("Failed to load manifest");
        Pipeline::new(config, bundler)
            .run(&mut manifest)
            .expect("Pipeline run failed")
    }

    /// The written `manifest.json` as raw JSON.
    pub fn output_manifest(&self, config: &Config) -> serde_json::Value {
        let content =
            fs::read_to_string(config.output_manifest()).expect("Failed to read manifest.json");
        serde_json::from_str(&content).expect("manifest.json is not JSON")
    }

    /// Read a file relative to the output directory.
    pub fn read_output(&self, config: &Config, relative: &str) -> String {
        fs::read_to_string(config.outdir.join(relative))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Find an available port for testing.
pub fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
