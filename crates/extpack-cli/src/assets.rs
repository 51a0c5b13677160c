//! Static asset copying.
//!
//! Mirrors the public directory into `<outdir>/<public name>/` and registers
//! every copied file so that manifest fields naming it resolve without going
//! through the bundler.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use extpack_manifest::paths::{posix_path, relative_posix};
use extpack_manifest::PathRegistry;

/// One copied file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedAsset {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Output path relative to the output directory, forward slashes.
    pub relative: String,
}

/// Copies `public_dir` into `outdir` and registers the copies.
///
/// A missing public directory is a no-op. Files that fail to copy are
/// logged and left out; the rest of the tree is still copied.
///
/// Each copy is registered under its absolute source path, its path relative
/// to `root` (with and without a leading `./`), and its path relative to the
/// public directory resolved against `root` when nothing exists there.
pub fn copy_static_assets(
    public_dir: &Path,
    outdir: &Path,
    root: &Path,
    registry: &mut PathRegistry,
) -> Vec<CopiedAsset> {
    if !public_dir.is_dir() {
        tracing::debug!(dir = %public_dir.display(), "no public directory");
        return Vec::new();
    }

    let public_name = public_dir
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("public"));
    let target_root = outdir.join(public_name);

    let mut files: Vec<PathBuf> = WalkDir::new(public_dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| !path.starts_with(outdir))
        .collect();
    // Sort for deterministic order
    files.sort();

    let mut copied = Vec::with_capacity(files.len());
    for source in files {
        let Ok(inside) = source.strip_prefix(public_dir) else {
            continue;
        };
        let output = target_root.join(inside);

        let result = output
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| std::fs::copy(&source, &output));
        if let Err(e) = result {
            tracing::warn!(
                source = %source.display(),
                output = %output.display(),
                "failed to copy static asset: {}",
                e
            );
            continue;
        }

        let relative = relative_posix(outdir, &output);
        registry.insert_aliases(aliases(&source, inside, root), &relative);
        copied.push(CopiedAsset {
            source,
            output,
            relative,
        });
    }

    tracing::debug!(
        count = copied.len(),
        target = %target_root.display(),
        "copied static assets"
    );
    copied
}

fn aliases(source: &Path, inside: &Path, root: &Path) -> Vec<String> {
    let mut forms = vec![
        source.to_string_lossy().to_string(),
        posix_path(source),
    ];

    if let Ok(from_root) = source.strip_prefix(root) {
        let from_root = posix_path(from_root);
        forms.push(format!("./{}", from_root));
        forms.push(from_root);
    }

    let shorthand = root.join(inside);
    if !shorthand.exists() {
        forms.push(posix_path(&shorthand));
    }

    forms
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_public_dir_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let mut registry = PathRegistry::new();
        let copied = copy_static_assets(
            &tmp.path().join("public"),
            &tmp.path().join("dist"),
            tmp.path(),
            &mut registry,
        );
        assert!(copied.is_empty());
        assert!(registry.is_empty());
        assert!(!tmp.path().join("dist").exists());
    }

    #[test]
    fn test_copies_tree_and_registers_forms() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("public/icons")).unwrap();
        std::fs::write(root.join("public/icons/16.png"), b"png16").unwrap();
        std::fs::write(root.join("public/robots.txt"), b"txt").unwrap();

        let mut registry = PathRegistry::new();
        let copied = copy_static_assets(
            &root.join("public"),
            &root.join("dist"),
            root,
            &mut registry,
        );

        let relatives: Vec<&str> = copied.iter().map(|c| c.relative.as_str()).collect();
        assert_eq!(relatives, vec!["public/icons/16.png", "public/robots.txt"]);
        assert_eq!(
            std::fs::read(root.join("dist/public/icons/16.png")).unwrap(),
            b"png16"
        );

        let expected = Some("public/icons/16.png");
        assert_eq!(registry.get(&posix_path(&root.join("public/icons/16.png"))), expected);
        assert_eq!(registry.get("public/icons/16.png"), expected);
        assert_eq!(registry.get("./public/icons/16.png"), expected);
        assert_eq!(registry.get(&posix_path(&root.join("icons/16.png"))), expected);
    }

    #[test]
    fn test_copies_land_under_the_public_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("assets/static")).unwrap();
        std::fs::write(root.join("assets/static/16.png"), b"png").unwrap();

        let mut registry = PathRegistry::new();
        let copied = copy_static_assets(
            &root.join("assets/static"),
            &root.join("dist"),
            root,
            &mut registry,
        );

        assert_eq!(copied[0].relative, "static/16.png");
        assert!(root.join("dist/static/16.png").is_file());
        assert_eq!(registry.get("assets/static/16.png"), Some("static/16.png"));
    }

    #[test]
    fn test_shorthand_not_registered_when_shadowed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("public")).unwrap();
        std::fs::write(root.join("public/logo.svg"), b"a").unwrap();
        std::fs::write(root.join("logo.svg"), b"b").unwrap();

        let mut registry = PathRegistry::new();
        copy_static_assets(&root.join("public"), &root.join("dist"), root, &mut registry);

        assert!(!registry.contains(&posix_path(&root.join("logo.svg"))));
        assert!(registry.contains("public/logo.svg"));
    }
}
