//! Service worker composition wrapper.
//!
//! In dev mode the manifest's service worker is replaced by `compose.js`,
//! which carries the live-reload client and imports the user's own worker
//! when there is one.

use std::path::{Path, PathBuf};

use extpack_manifest::paths::relative_posix;

use super::env::DevEnvironment;

/// File name of the wrapper, written to the project root.
pub const COMPOSE_FILE_NAME: &str = "compose.js";

const TEMPLATE: &str = include_str!("../../assets/compose_template.js");

const NO_WORKER: &str = "// No background service worker; running the keep-alive client only.";

/// Renders the wrapper for `service_worker` (a path relative to the project root).
pub fn render(env: &DevEnvironment, service_worker: Option<&str>) -> String {
    let import = match service_worker {
        Some(path) => format!("import \"./{}\";", path.trim_start_matches("./")),
        None => NO_WORKER.to_string(),
    };

    TEMPLATE
        .replace("{{IMPORT}}", &import)
        .replace("{{PORT}}", &env.port.to_string())
        .replace("{{PACKAGE}}", &env.package)
}

/// Writes the wrapper into `root` and returns its path.
///
/// `service_worker` is the value declared in the manifest source. It is
/// imported only when the file exists.
pub fn write_compose(
    root: &Path,
    env: &DevEnvironment,
    service_worker: Option<&str>,
) -> std::io::Result<PathBuf> {
    let worker = service_worker
        .map(|value| root.join(value))
        .filter(|path| path.is_file());

    let import = match &worker {
        Some(path) => {
            tracing::info!(worker = %path.display(), "composing background service worker");
            Some(relative_posix(root, path))
        }
        None => {
            tracing::info!("no background service worker found; creating one");
            None
        }
    };

    let path = root.join(COMPOSE_FILE_NAME);
    std::fs::write(&path, render(env, import.as_deref()))?;
    Ok(path)
}
