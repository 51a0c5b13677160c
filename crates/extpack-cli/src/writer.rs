//! Manifest writer.

use std::path::Path;

use serde_json::{Map, Value};

use extpack_manifest::paths::{is_external, to_posix};
use extpack_manifest::Manifest;

use crate::pipeline::PipelineError;

/// Serializes `manifest` to `path` with 2-space indentation.
///
/// Path-valued fields are converted to forward slashes first, as are
/// path-like strings under any other key (`web_accessible_resources`,
/// `declarative_net_request` rule files). No other substitution happens here.
pub fn write_manifest(manifest: &mut Manifest, path: &Path) -> Result<(), PipelineError> {
    normalize_separators(manifest);
    normalize_extra_paths(manifest);

    let json = manifest.to_json_pretty().map_err(PipelineError::Serialize)?;
    std::fs::write(path, json).map_err(|source| PipelineError::WriteManifest {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), "wrote manifest");
    Ok(())
}

fn normalize_separators(manifest: &mut Manifest) {
    for field in manifest.path_fields() {
        let Some(value) = manifest.get(&field) else {
            continue;
        };
        let posix = to_posix(value);
        if posix != value {
            manifest.set(&field, posix);
        }
    }
}

fn normalize_extra_paths(manifest: &mut Manifest) {
    let mut maps: Vec<&mut Map<String, Value>> = vec![&mut manifest.extra];
    if let Some(background) = manifest.background.as_mut() {
        maps.push(&mut background.extra);
    }
    for script in manifest.content_scripts.iter_mut().flatten() {
        maps.push(&mut script.extra);
    }
    if let Some(action) = manifest.action.as_mut() {
        maps.push(&mut action.extra);
    }
    if let Some(options) = manifest.options_ui.as_mut() {
        maps.push(&mut options.extra);
    }

    for map in maps {
        map.values_mut().for_each(normalize_value);
    }
}

fn normalize_value(value: &mut Value) {
    match value {
        Value::String(s) if is_path_like(s) => *s = to_posix(s),
        Value::Array(items) => items.iter_mut().for_each(normalize_value),
        Value::Object(map) => map.values_mut().for_each(normalize_value),
        _ => {}
    }
}

/// A string with a backslash separator and no whitespace that does not
/// point outside the filesystem. Prose and URLs are left alone.
fn is_path_like(value: &str) -> bool {
    value.contains('\\') && !value.chars().any(char::is_whitespace) && !is_external(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_without_path_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let source = r#"{
  "manifest_version": 3,
  "name": "Example",
  "version": "1.0.2",
  "permissions": [
    "storage",
    "tabs"
  ],
  "description": "Does things"
}"#;
        let mut manifest = Manifest::from_json(source).unwrap();
        let path = tmp.path().join("manifest.json");

        write_manifest(&mut manifest, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), source);
    }

    #[test]
    fn test_backslashes_become_forward_slashes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::from_json(
            r#"{"background": {"service_worker": "src\\bg.js"}, "icons": {"16": "public\\16.png"}}"#,
        )
        .unwrap();
        let path = tmp.path().join("manifest.json");

        write_manifest(&mut manifest, &path).unwrap();

        let written = Manifest::load(&path).unwrap();
        assert_eq!(written.service_worker(), Some("src/bg.js"));
        assert!(std::fs::read_to_string(&path).unwrap().contains(r#""16": "public/16.png""#));
    }

    #[test]
    fn test_path_like_extras_become_forward_slashes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::from_json(
            r#"{
                "description": "Ships C:\\ paths as is",
                "homepage_url": "https://example.com/a\\b",
                "web_accessible_resources": [
                    {"resources": ["assets\\img\\*.png", "fonts\\a.woff2"], "matches": ["<all_urls>"]}
                ],
                "content_scripts": [{"matches": ["<all_urls>"], "js": ["a.js"], "exclude_globs": ["*\\skip\\*"]}]
            }"#,
        )
        .unwrap();
        let path = tmp.path().join("manifest.json");

        write_manifest(&mut manifest, &path).unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written["web_accessible_resources"][0]["resources"],
            serde_json::json!(["assets/img/*.png", "fonts/a.woff2"])
        );
        assert_eq!(
            written["content_scripts"][0]["exclude_globs"],
            serde_json::json!(["*/skip/*"])
        );
        assert_eq!(written["description"], "Ships C:\\ paths as is");
        assert_eq!(written["homepage_url"], "https://example.com/a\\b");
    }

    #[test]
    fn test_unwritable_target_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::new();
        let err = write_manifest(&mut manifest, &tmp.path().join("missing/manifest.json"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::WriteManifest { .. }));
    }
}
