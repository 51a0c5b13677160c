//! Dev session controller.
//!
//! Runs the pipeline once, then watches the project and rebuilds on change,
//! pushing `reload` to the running extension after every rebuild.
//!
//! # Modules
//!
//! - [`state`]: the pure Idle / Building / Watching / Debouncing machine
//! - [`watcher`]: filesystem events, filtered
//! - [`server`]: the live-reload WebSocket server
//! - [`compose`]: the generated service worker wrapper
//! - [`env`]: port and package name conventions

pub mod compose;
pub mod env;
pub mod server;
pub mod state;
pub mod watcher;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use extpack_manifest::Manifest;

use crate::bundler::Bundler;
use crate::config::Config;
use crate::pipeline::{Pipeline, PipelineReport};
use crate::status;

pub use compose::{write_compose, COMPOSE_FILE_NAME};
pub use env::DevEnvironment;
pub use server::{ReloadServer, Reloader, RELOAD_MESSAGE};
pub use state::{Phase, SessionState};
pub use watcher::{watch_project, WatchFilter};

/// Bundler shared with the blocking build pool.
pub type SharedBundler = Arc<dyn Bundler + Send + Sync>;

/// One rebuild: reload the manifest source, regenerate the wrapper and run
/// the pipeline.
///
/// The manifest is read from disk every time so edits to it are picked up.
pub fn rebuild(
    config: &Config,
    env: &DevEnvironment,
    bundler: &dyn Bundler,
) -> Result<PipelineReport> {
    let mut manifest = Manifest::load(&config.manifest)?;

    write_compose(&config.root, env, manifest.service_worker())
        .context("Failed to write service worker wrapper")?;
    manifest.set_service_worker(COMPOSE_FILE_NAME);

    let report = Pipeline::new(config, bundler).run(&mut manifest)?;
    Ok(report)
}

/// A dev session.
pub struct DevSession {
    config: Config,
    env: DevEnvironment,
    bundler: SharedBundler,
}

impl DevSession {
    pub fn new(config: Config, env: DevEnvironment, bundler: SharedBundler) -> Self {
        Self {
            config,
            env,
            bundler,
        }
    }

    /// Runs until `shutdown` fires.
    ///
    /// Failing to bind the reload server or to start watching is fatal.
    /// Failed builds are reported and the session keeps watching.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut state = SessionState::new(Duration::from_millis(self.config.debounce_ms));

        state.start();
        let outcome = join_build(self.spawn_build()).await;
        state.finish_build(Instant::now());
        self.report(outcome);

        let server = ReloadServer::bind(self.env.port)
            .await
            .with_context(|| format!("Failed to bind reload server on port {}", self.env.port))?;
        let addr = server.local_addr()?;
        let reloader = server.reloader();
        tokio::spawn(server.serve(shutdown.resubscribe()));

        let (change_tx, mut change_rx) = mpsc::channel(256);
        let filter = WatchFilter::new(&self.config.root, &self.config.outdir);
        let watcher = watch_project(&self.config.root, filter, change_tx)
            .with_context(|| format!("Failed to watch {}", self.config.root.display()))?;

        status::print_watching(&self.config.root, addr);

        let (done_tx, mut done_rx) = mpsc::channel::<Result<PipelineReport>>(1);

        loop {
            let deadline = state.deadline();

            tokio::select! {
                Some(path) = change_rx.recv() => {
                    tracing::debug!(path = %path.display(), "change detected");
                    state.on_change(Instant::now());
                }
                () = async {
                    if let Some(deadline) = deadline {
                        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                    }
                }, if deadline.is_some() => {
                    if state.poll(Instant::now()) {
                        status::print_rebuilding();
                        let build = self.spawn_build();
                        let done_tx = done_tx.clone();
                        tokio::spawn(async move {
                            let _ = done_tx.send(join_build(build).await).await;
                        });
                    }
                }
                Some(outcome) = done_rx.recv() => {
                    state.finish_build(Instant::now());
                    if self.report(outcome) {
                        let reached = reloader.reload();
                        tracing::debug!(clients = reached, "reload broadcast");
                    }
                }
                _ = shutdown.recv() => {
                    state.terminate();
                    break;
                }
            }
        }

        drop(watcher);
        status::print_closed();
        Ok(())
    }

    /// Runs one rebuild on the blocking pool.
    fn spawn_build(&self) -> JoinHandle<Result<PipelineReport>> {
        let config = self.config.clone();
        let env = self.env.clone();
        let bundler = Arc::clone(&self.bundler);
        tokio::task::spawn_blocking(move || rebuild(&config, &env, bundler.as_ref()))
    }

    /// Prints a build outcome. Returns true if the extension should reload.
    fn report(&self, outcome: Result<PipelineReport>) -> bool {
        match outcome {
            Ok(report) => {
                status::print_report(&report);
                report.bundler_ok()
            }
            Err(e) => {
                tracing::error!("rebuild failed: {:#}", e);
                status::print_error(&e);
                false
            }
        }
    }
}

async fn join_build(handle: JoinHandle<Result<PipelineReport>>) -> Result<PipelineReport> {
    handle.await.context("Build task panicked")?
}
