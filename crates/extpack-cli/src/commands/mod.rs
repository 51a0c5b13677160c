//! CLI command implementations

pub mod build;
pub mod dev;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::bundler::{SubprocessBundler, SubprocessConfig};
use crate::config::{Config, ConfigOverrides};

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Project root; defaults to the current directory.
    pub root: Option<PathBuf>,
    /// Explicit config file, relative to the root.
    pub config_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

impl CommandOptions {
    /// Resolves the project root and loads its configuration.
    pub fn load_config(&self) -> Result<Config> {
        let root = project_root(self.root.as_deref())?;
        Config::load(&root, self.config_file.as_deref(), &self.overrides)
            .with_context(|| format!("Failed to load configuration for {}", root.display()))
    }
}

/// Makes `root` absolute against the current directory.
fn project_root(root: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let root = match root {
        Some(root) => cwd.join(root),
        None => cwd,
    };
    if !root.is_dir() {
        anyhow::bail!("project root {} is not a directory", root.display());
    }
    Ok(root)
}

/// The bundler configured for `config`.
pub(crate) fn subprocess_bundler(config: &Config) -> SubprocessBundler {
    SubprocessBundler::with_config(
        config.bundler.clone(),
        SubprocessConfig {
            timeout_seconds: config.bundler_timeout_secs,
            working_dir: Some(config.root.clone()),
        },
    )
}
