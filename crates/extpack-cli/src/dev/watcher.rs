//! Project file watcher.

use std::path::{Component, Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::compose::COMPOSE_FILE_NAME;

/// Directory names whose contents never trigger a rebuild.
const IGNORED_DIRS: &[&str] = &["node_modules", ".git"];

/// Decides which changed paths matter.
///
/// Watch events carry canonical paths, so both the configured and the
/// canonical forms of the excluded locations are kept.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    outdirs: Vec<PathBuf>,
    composes: Vec<PathBuf>,
}

impl WatchFilter {
    pub fn new(root: &Path, outdir: &Path) -> Self {
        Self {
            outdirs: with_canonical(outdir.to_path_buf()),
            composes: with_canonical(root.join(COMPOSE_FILE_NAME)),
        }
    }

    /// Returns false for the output directory, the generated wrapper and
    /// dependency or VCS directories.
    pub fn is_relevant(&self, path: &Path) -> bool {
        if self.outdirs.iter().any(|outdir| path.starts_with(outdir))
            || self.composes.iter().any(|compose| path == compose)
        {
            return false;
        }
        !path.components().any(|component| match component {
            Component::Normal(name) => IGNORED_DIRS.iter().any(|ignored| name == *ignored),
            _ => false,
        })
    }
}

fn with_canonical(path: PathBuf) -> Vec<PathBuf> {
    let canonical = path
        .parent()
        .and_then(|parent| std::fs::canonicalize(parent).ok())
        .zip(path.file_name())
        .map(|(parent, name)| parent.join(name));
    match canonical {
        Some(canonical) if canonical != path => vec![path, canonical],
        _ => vec![path],
    }
}

/// Watches `root` recursively and forwards relevant changed paths.
///
/// The returned watcher must be kept alive for events to flow.
pub fn watch_project(
    root: &Path,
    filter: WatchFilter,
    sender: mpsc::Sender<PathBuf>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in event.paths {
                    if filter.is_relevant(&path) {
                        // Receiver gone means the session is over
                        let _ = sender.blocking_send(path);
                    }
                }
            }
            Err(e) => tracing::warn!("watch error: {}", e),
        },
        notify::Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    tracing::debug!(root = %root.display(), "watching project");
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_ignores_generated_and_dependency_paths() {
        let filter = WatchFilter::new(Path::new("/p"), Path::new("/p/dist"));

        assert!(filter.is_relevant(Path::new("/p/src/bg.ts")));
        assert!(filter.is_relevant(Path::new("/p/manifest.json")));
        assert!(filter.is_relevant(Path::new("/p/distant/file.ts")));

        assert!(!filter.is_relevant(Path::new("/p/dist/bg.js")));
        assert!(!filter.is_relevant(Path::new("/p/compose.js")));
        assert!(!filter.is_relevant(Path::new("/p/node_modules/x/index.js")));
        assert!(!filter.is_relevant(Path::new("/p/.git/HEAD")));
    }
}
