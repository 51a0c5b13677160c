//! Dev command implementation
//!
//! Builds, then watches the project and live-reloads the extension until
//! Ctrl+C.

use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{subprocess_bundler, CommandOptions};
use crate::dev::{DevEnvironment, DevSession, SharedBundler};

/// Run the dev command
///
/// # Returns
/// Exit code: 0 on clean shutdown
pub fn run(options: &CommandOptions) -> Result<ExitCode> {
    let config = options.load_config()?;
    let env = DevEnvironment::from_env(&config.root);
    let bundler: SharedBundler = Arc::new(subprocess_bundler(&config));

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async move {
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                tracing::info!("shutting down");
                let _ = shutdown_tx.send(());
            }
        });

        DevSession::new(config, env, bundler).run(shutdown_rx).await
    })?;

    Ok(ExitCode::SUCCESS)
}
