//! Subprocess-based bundler.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::contract::{BuildRequest, BuildResult, RawBuildResult};
use super::{Bundler, BundlerError};

/// Bun build driver used by the default bundler command.
pub const DRIVER_SOURCE: &str = include_str!("../../assets/bun_driver.js");

/// Configuration for the subprocess bundler.
#[derive(Debug, Clone)]
pub struct SubprocessConfig {
    /// Timeout in seconds.
    pub timeout_seconds: u64,
    /// Working directory; defaults to the request's project root.
    pub working_dir: Option<PathBuf>,
}

impl Default for SubprocessConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 300, // 5 minutes
            working_dir: None,
        }
    }
}

/// Runs an external bundler command.
#[derive(Debug, Clone)]
pub struct SubprocessBundler {
    command: Vec<String>,
    config: SubprocessConfig,
}

impl SubprocessBundler {
    /// Creates a bundler for `command` (program followed by arguments).
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            config: SubprocessConfig::default(),
        }
    }

    /// Creates a bundler with custom configuration.
    pub fn with_config(command: Vec<String>, config: SubprocessConfig) -> Self {
        Self { command, config }
    }

    /// Returns the configured command line.
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Builds the process command for a request.
    ///
    /// Placeholders: `{request}` (request file), `{outdir}`, `{driver}`
    /// (embedded Bun driver, only written when referenced).
    fn prepare(
        &self,
        request: &BuildRequest,
        scratch: &Path,
    ) -> Result<Command, BundlerError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| BundlerError::Prepare("empty bundler command".to_string()))?;

        let request_path = scratch.join("request.json");
        let request_json = serde_json::to_string_pretty(request)
            .map_err(|e| BundlerError::Prepare(format!("failed to serialize request: {}", e)))?;
        std::fs::write(&request_path, request_json)
            .map_err(|e| BundlerError::Prepare(format!("failed to write request: {}", e)))?;

        let driver_path = scratch.join("driver.js");
        let uses_driver = self.command.iter().any(|arg| arg.contains("{driver}"));
        if uses_driver {
            std::fs::write(&driver_path, DRIVER_SOURCE)
                .map_err(|e| BundlerError::Prepare(format!("failed to write driver: {}", e)))?;
        }

        let request_str = request_path.to_string_lossy().to_string();
        let outdir_str = request.outdir.to_string_lossy().to_string();
        let driver_str = driver_path.to_string_lossy().to_string();
        let substitute = |arg: &str| {
            arg.replace("{request}", &request_str)
                .replace("{outdir}", &outdir_str)
                .replace("{driver}", &driver_str)
        };

        let mut cmd = Command::new(substitute(program));
        for arg in args {
            cmd.arg(substitute(arg));
        }
        if !self.command.iter().any(|arg| arg.contains("{request}")) {
            cmd.arg("--request").arg(&request_path);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.current_dir(
            self.config
                .working_dir
                .clone()
                .unwrap_or_else(|| request.root.clone()),
        );

        Ok(cmd)
    }
}

impl Bundler for SubprocessBundler {
    fn build(&self, request: &BuildRequest) -> Result<BuildResult, BundlerError> {
        std::fs::create_dir_all(&request.outdir).map_err(|e| {
            BundlerError::Prepare(format!("failed to create output directory: {}", e))
        })?;

        // Removed when dropped, after the process has exited
        let scratch = tempfile::tempdir()
            .map_err(|e| BundlerError::Prepare(format!("failed to create temp dir: {}", e)))?;
        let mut cmd = self.prepare(request, scratch.path())?;

        tracing::debug!(
            command = ?self.command,
            entrypoints = request.entrypoints.len(),
            "invoking bundler"
        );

        let child = cmd.spawn().map_err(|e| {
            BundlerError::SpawnFailed(format!("failed to spawn '{}': {}", self.command[0], e))
        })?;

        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let output = wait_with_timeout(child, timeout)?;

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(BundlerError::NonZeroExit { code, stderr });
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(stderr = %stderr.trim(), "bundler stderr");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw = parse_result(&stdout)?;
        Ok(raw.normalize(&request.outdir))
    }
}

/// Parses the result object from bundler stdout.
///
/// Bundlers sometimes print progress before the result, so the last line
/// that parses as a result object wins when the whole output does not.
fn parse_result(stdout: &str) -> Result<RawBuildResult, BundlerError> {
    if let Ok(raw) = serde_json::from_str::<RawBuildResult>(stdout.trim()) {
        return Ok(raw);
    }

    stdout
        .lines()
        .rev()
        .filter(|line| line.trim_start().starts_with('{'))
        .find_map(|line| serde_json::from_str::<RawBuildResult>(line.trim()).ok())
        .ok_or_else(|| {
            let preview: String = stdout.chars().take(200).collect();
            BundlerError::InvalidResult(format!("no result object in output: {}", preview))
        })
}

struct ProcessOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    })
}

/// Waits for a child process with timeout.
///
/// Both pipes are drained on background threads so a chatty bundler cannot
/// block on a full pipe while we poll.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<ProcessOutput, BundlerError> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let start = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BundlerError::Timeout {
                        timeout_seconds: timeout.as_secs(),
                    });
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                return Err(BundlerError::SpawnFailed(format!(
                    "failed to wait for process: {}",
                    e
                )));
            }
        }
    };

    Ok(ProcessOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}
