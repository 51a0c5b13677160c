//! Tests for the manifest model.

use pretty_assertions::assert_eq;

use super::*;

const FULL_MANIFEST: &str = r#"{
  "manifest_version": 3,
  "name": "demo",
  "version": "1.2.3",
  "background": { "service_worker": "src/bg.ts" },
  "content_scripts": [
    { "matches": ["<all_urls>"], "ts": ["src/content.ts"], "css": ["src/content.css"] },
    { "matches": ["https://example.com/*"], "js": ["src/plain.js"], "ts": ["src/extra.ts"] }
  ],
  "action": {
    "default_popup": "pages/popup.html",
    "default_icon": { "16": "public/16.png" }
  },
  "options_page": "pages/options.html",
  "options_ui": { "page": "pages/options_ui.html", "open_in_tab": false },
  "icons": { "16": "public/16.png", "128": "public/128.png" }
}"#;

#[test]
fn test_manifest_version_defaults_to_three() {
    let manifest = Manifest::from_json(r#"{"name": "demo"}"#).unwrap();
    assert_eq!(manifest.manifest_version, DEFAULT_MANIFEST_VERSION);
    assert_eq!(manifest.extra.get("name"), Some(&Value::from("demo")));
}

#[test]
fn test_round_trip_without_path_fields() {
    let input = r#"{
  "manifest_version": 3,
  "name": "demo",
  "version": "0.1.0",
  "description": "does nothing",
  "permissions": [
    "storage",
    "tabs"
  ]
}"#;
    let manifest = Manifest::from_json(input).unwrap();
    assert_eq!(manifest.to_json_pretty().unwrap(), input);
}

#[test]
fn test_unknown_nested_keys_survive() {
    let manifest = Manifest::from_json(FULL_MANIFEST).unwrap();
    let options_ui = manifest.options_ui.as_ref().unwrap();
    assert_eq!(options_ui.extra.get("open_in_tab"), Some(&Value::Bool(false)));

    let scripts = manifest.content_scripts.as_ref().unwrap();
    assert!(scripts[0].extra.contains_key("matches"));
}

#[test]
fn test_icon_set_accepts_string_and_map() {
    let single = Manifest::from_json(r#"{"icons": "icon.png"}"#).unwrap();
    assert_eq!(single.icons, Some(IconSet::Single("icon.png".to_string())));
    assert_eq!(single.path_fields(), vec![FieldId::Icon { size: None }]);

    let sized = Manifest::from_json(r#"{"icons": {"48": "a.png", "16": "b.png"}}"#).unwrap();
    assert_eq!(
        sized.path_fields(),
        vec![
            FieldId::Icon {
                size: Some("48".to_string())
            },
            FieldId::Icon {
                size: Some("16".to_string())
            },
        ]
    );
}

#[test]
fn test_rename_script_fields_folds_ts_into_js() {
    let mut manifest = Manifest::from_json(FULL_MANIFEST).unwrap();
    manifest.rename_script_fields();

    let scripts = manifest.content_scripts.as_ref().unwrap();
    assert_eq!(scripts[0].ts, None);
    assert_eq!(scripts[0].js, Some(vec!["src/content.ts".to_string()]));
    assert_eq!(
        scripts[1].js,
        Some(vec!["src/plain.js".to_string(), "src/extra.ts".to_string()])
    );

    let json = manifest.to_json().unwrap();
    assert!(!json.contains("\"ts\""));
}

#[test]
fn test_path_fields_precedence() {
    let mut manifest = Manifest::from_json(FULL_MANIFEST).unwrap();
    manifest.rename_script_fields();

    let fields: Vec<String> = manifest.path_fields().iter().map(|f| f.to_string()).collect();
    assert_eq!(
        fields,
        vec![
            "background.service_worker",
            "content_scripts[0].js[0]",
            "content_scripts[0].css[0]",
            "content_scripts[1].js[0]",
            "content_scripts[1].js[1]",
            "action.default_popup",
            "options_page",
            "options_ui.page",
            "icons.16",
            "icons.128",
            "action.default_icon.16",
        ]
    );
}

#[test]
fn test_get_and_set_fields() {
    let mut manifest = Manifest::from_json(FULL_MANIFEST).unwrap();
    manifest.rename_script_fields();

    let field = FieldId::ContentScriptCss {
        script: 0,
        index: 0,
    };
    assert_eq!(manifest.get(&field), Some("src/content.css"));
    assert!(manifest.set(&field, "content.css"));
    assert_eq!(manifest.get(&field), Some("content.css"));

    let icon = FieldId::ActionIcon {
        size: Some("16".to_string()),
    };
    assert!(manifest.set(&icon, "public/16.png"));
    assert_eq!(manifest.get(&icon), Some("public/16.png"));

    let missing = FieldId::ContentScriptJs {
        script: 7,
        index: 0,
    };
    assert_eq!(manifest.get(&missing), None);
    assert!(!manifest.set(&missing, "x.js"));
}

#[test]
fn test_set_does_not_create_fields() {
    let mut manifest = Manifest::new();
    assert!(!manifest.set(&FieldId::OptionsPage, "options.html"));
    assert!(manifest.options_page.is_none());
}

#[test]
fn test_mark_module_worker() {
    let mut manifest = Manifest::from_json(FULL_MANIFEST).unwrap();
    manifest.mark_module_worker();
    let background = manifest.background.as_ref().unwrap();
    assert_eq!(background.worker_type.as_deref(), Some(MODULE_WORKER_TYPE));

    let mut empty = Manifest::new();
    empty.mark_module_worker();
    assert!(empty.background.is_none());
}

#[test]
fn test_set_service_worker_replaces_background() {
    let mut manifest = Manifest::from_json(FULL_MANIFEST).unwrap();
    manifest.set_service_worker("/p/compose.js");
    assert_eq!(manifest.service_worker(), Some("/p/compose.js"));

    let json = manifest.to_json().unwrap();
    assert!(json.contains(r#""background":{"service_worker":"/p/compose.js","type":"module"}"#));
}

#[test]
fn test_load_missing_file() {
    let err = Manifest::load(Path::new("/nonexistent/manifest.json")).unwrap_err();
    assert!(matches!(err, ManifestError::Read { .. }));
}
