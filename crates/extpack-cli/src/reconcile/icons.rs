//! Stable icon file names.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

fn hash_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+)[-.]([a-z0-9]{8})$").expect("valid regex"))
}

/// Returns `path` with the bundler's content hash removed from its file
/// name, or `None` when the name carries no hash.
///
/// A hash is an 8-character lowercase alphanumeric segment containing at
/// least one digit, separated from the stem by `-` or `.`.
pub fn strip_content_hash(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let captures = hash_suffix().captures(stem)?;
    if !captures[2].chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut file_name = captures[1].to_string();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        file_name.push('.');
        file_name.push_str(extension);
    }
    Some(path.with_file_name(file_name))
}
