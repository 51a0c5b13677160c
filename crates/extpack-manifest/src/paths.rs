//! Forward-slash path helpers.
//!
//! Manifest values are consumed by a platform-independent JSON format, so
//! every path that ends up in the manifest goes through [`to_posix`].
//! Resolution is purely lexical: nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Converts a path string to forward-slash form.
///
/// Backslashes become `/` and doubled separators collapse. URLs (anything
/// containing `://`) are returned unchanged.
pub fn to_posix(path: &str) -> String {
    if path.contains("://") {
        return path.to_string();
    }

    let replaced = path.replace('\\', "/");
    let mut out = String::with_capacity(replaced.len());
    let mut previous_slash = false;
    for ch in replaced.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(ch);
    }
    out
}

/// Converts a [`Path`] to a forward-slash string.
pub fn posix_path(path: &Path) -> String {
    to_posix(&path.to_string_lossy())
}

/// Returns true if the value points outside the local filesystem.
pub fn is_external(value: &str) -> bool {
    value.contains("://") || value.starts_with("//") || value.starts_with("data:")
}

/// Returns true if the value ends in something that looks like a file extension.
///
/// Version-like values (`1.0.2`) do not count: the extension needs a letter.
pub fn has_file_extension(value: &str) -> bool {
    let file_name = value.rsplit(['/', '\\']).next().unwrap_or(value);
    match file_name.rfind('.') {
        Some(0) | None => false,
        Some(dot) => {
            let ext = &file_name[dot + 1..];
            !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
                && ext.chars().any(|c| c.is_ascii_alphabetic())
        }
    }
}

/// Lexically normalizes a path, removing `.` and resolving `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves `value` against `base` unless it is already absolute.
pub fn resolve_against(base: &Path, value: &str) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() || value.starts_with('/') {
        normalize(candidate)
    } else {
        normalize(&base.join(candidate))
    }
}

/// Computes the forward-slash path of `to` relative to the directory `from`.
///
/// Both paths are normalized first. When they share no common root the
/// absolute form of `to` is returned.
pub fn relative_posix(from: &Path, to: &Path) -> String {
    let from = normalize(from);
    let to = normalize(to);

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 && (from.has_root() || to.has_root()) {
        return posix_path(&to);
    }

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }
    posix_path(&rel)
}
