//! Tests for output reconciliation.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;

use super::*;
use crate::bundler::{Loader, OutputKind};
use extpack_manifest::extract_references;

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    outdir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let outdir = root.join("dist");
        std::fs::create_dir_all(&outdir).unwrap();
        Self {
            _tmp: tmp,
            root,
            outdir,
        }
    }

    fn out(&self, relative: &str) -> PathBuf {
        self.outdir.join(relative)
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn reconcile(
        &self,
        manifest: &mut Manifest,
        outputs: &[OutputRecord],
    ) -> (Reconciliation, PathRegistry) {
        let references = extract_references(manifest, &self.root);
        let documents = crate::html::scan_documents(&references);
        let entrypoints: Vec<String> = references
            .iter()
            .map(|reference| reference.source_path.clone())
            .chain(crate::html::secondary_entrypoints(&documents))
            .collect();
        let mut registry = PathRegistry::new();
        let report = Reconciler::new(&self.root, &self.outdir, &mut registry, outputs)
            .with_entrypoints(&entrypoints)
            .run(manifest, &references, &documents);
        (report, registry)
    }
}

fn manifest(json: &str) -> Manifest {
    Manifest::from_json(json).unwrap()
}

#[test]
fn test_outputs_follow_submission_order() {
    let fx = Fixture::new();
    let mut m = manifest(
        r#"{
            "background": {"service_worker": "src/bg.ts"},
            "content_scripts": [{"matches": ["<all_urls>"], "ts": ["src/content.ts"], "css": ["src/content.css"]}]
        }"#,
    );
    let outputs = vec![
        OutputRecord::script(fx.out("src/bg.js")),
        OutputRecord::script(fx.out("src/content.js")),
        OutputRecord::style(fx.out("src/content.css")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(report.resolved, 3);
    assert_eq!(m.get(&FieldId::ServiceWorker), Some("src/bg.js"));
    assert_eq!(
        m.get(&FieldId::ContentScriptJs { script: 0, index: 0 }),
        Some("src/content.js")
    );
    assert_eq!(
        m.get(&FieldId::ContentScriptCss { script: 0, index: 0 }),
        Some("src/content.css")
    );
}

#[test]
fn test_chunks_and_sourcemaps_are_skipped() {
    let fx = Fixture::new();
    let mut m = manifest(r#"{"background": {"service_worker": "bg.ts"}, "options_page": "opt.ts"}"#);
    let outputs = vec![
        OutputRecord::chunk(fx.out("chunk-abc123.js")),
        OutputRecord::script(fx.out("bg.js")),
        OutputRecord::new(fx.out("bg.js.map"), OutputKind::Sourcemap, Loader::Script),
        OutputRecord::script(fx.out("opt.js")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(m.get(&FieldId::ServiceWorker), Some("bg.js"));
    assert_eq!(m.get(&FieldId::OptionsPage), Some("opt.js"));
}

#[test]
fn test_duplicate_sources_share_one_output() {
    let fx = Fixture::new();
    let mut m = manifest(
        r#"{
            "content_scripts": [
                {"matches": ["https://a.example/*"], "ts": ["shared.ts"]},
                {"matches": ["https://b.example/*"], "ts": ["shared.ts", "extra.ts"]}
            ]
        }"#,
    );
    // One record per submitted entrypoint
    let outputs = vec![
        OutputRecord::script(fx.out("shared.js")),
        OutputRecord::script(fx.out("shared.js")),
        OutputRecord::script(fx.out("extra.js")),
    ];

    let (report, registry) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    let first = m.get(&FieldId::ContentScriptJs { script: 0, index: 0 });
    let second = m.get(&FieldId::ContentScriptJs { script: 1, index: 0 });
    assert_eq!(first, Some("shared.js"));
    assert_eq!(first, second);
    assert_eq!(
        m.get(&FieldId::ContentScriptJs { script: 1, index: 1 }),
        Some("extra.js")
    );
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_duplicate_without_own_record_keeps_alignment() {
    let fx = Fixture::new();
    let mut m = manifest(
        r#"{
            "content_scripts": [
                {"ts": ["shared.ts"]},
                {"ts": ["shared.ts", "extra.ts"]}
            ]
        }"#,
    );
    // The bundler collapsed the duplicate entrypoint
    let outputs = vec![
        OutputRecord::script(fx.out("shared.js")),
        OutputRecord::script(fx.out("extra.js")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(
        m.get(&FieldId::ContentScriptJs { script: 1, index: 0 }),
        Some("shared.js")
    );
    assert_eq!(
        m.get(&FieldId::ContentScriptJs { script: 1, index: 1 }),
        Some("extra.js")
    );
}

#[test]
fn test_each_repeat_consumes_its_own_slot() {
    let fx = Fixture::new();
    let mut m = manifest(
        r#"{
            "content_scripts": [
                {"ts": ["shared.ts"]},
                {"ts": ["shared.ts"]},
                {"ts": ["other.ts"]}
            ]
        }"#,
    );
    // The repeat's record carries a different name than the first one
    let outputs = vec![
        OutputRecord::script(fx.out("shared.js")),
        OutputRecord::script(fx.out("shared-2.js")),
        OutputRecord::script(fx.out("other.js")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(
        m.get(&FieldId::ContentScriptJs { script: 1, index: 0 }),
        Some("shared.js")
    );
    assert_eq!(
        m.get(&FieldId::ContentScriptJs { script: 2, index: 0 }),
        Some("other.js")
    );
}

#[test]
fn test_static_hit_does_not_consume_a_slot() {
    let fx = Fixture::new();
    let mut m = manifest(r#"{"background": {"service_worker": "bg.ts"}, "options_page": "opt.ts"}"#);
    let outputs = vec![
        OutputRecord::script(fx.out("bg.js")),
        OutputRecord::script(fx.out("opt.js")),
    ];
    let references = extract_references(&mut m, &fx.root);
    let entrypoints: Vec<String> = references.iter().map(|r| r.source_path.clone()).collect();

    let mut registry = PathRegistry::new();
    // Known before reconciliation, as a copied public file would be
    registry.insert(&posix_path(&fx.root.join("static.png")), "static.png".to_string());
    let mut reconciler = Reconciler::new(&fx.root, &fx.outdir, &mut registry, &outputs)
        .with_entrypoints(&entrypoints);
    let owner = Owner::Field(FieldId::OptionsPage);
    let reused = reconciler.resolve(&owner, &posix_path(&fx.root.join("static.png")), false);
    assert_eq!(reused.as_deref(), Some("static.png"));

    let report = reconciler.run(&mut m, &references, &[]);
    assert!(report.mismatches.is_empty());
    assert_eq!(m.get(&FieldId::ServiceWorker), Some("bg.js"));
    assert_eq!(m.get(&FieldId::OptionsPage), Some("opt.js"));
}

#[test]
fn test_exhausted_queue_leaves_field_unresolved() {
    let fx = Fixture::new();
    let mut m = manifest(r#"{"background": {"service_worker": "bg.ts"}, "options_page": "opt.ts"}"#);
    let outputs = vec![
        OutputRecord::script(fx.out("bg.js")),
        OutputRecord::chunk(fx.out("chunk-1.js")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert_eq!(m.get(&FieldId::ServiceWorker), Some("bg.js"));
    let expected_source = posix_path(&fx.root.join("opt.ts"));
    assert_eq!(m.get(&FieldId::OptionsPage), Some(expected_source.as_str()));
    assert_eq!(
        report.mismatches,
        vec![Mismatch::Exhausted {
            owner: Owner::Field(FieldId::OptionsPage),
            source: expected_source.clone(),
            remaining: vec![posix_path(&fx.out("chunk-1.js"))],
        }]
    );
    assert!(report.mismatches[0].to_string().contains("options_page"));
}

#[test]
fn test_family_mismatch_does_not_consume() {
    let fx = Fixture::new();
    let mut m = manifest(
        r#"{"content_scripts": [{"ts": ["a.ts"], "css": ["a.css"]}], "options_page": "opt.ts"}"#,
    );
    // The stylesheet failed to build
    let outputs = vec![
        OutputRecord::script(fx.out("a.js")),
        OutputRecord::script(fx.out("opt.js")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert_eq!(report.mismatches.len(), 1);
    assert!(matches!(
        &report.mismatches[0],
        Mismatch::Family { expected, .. } if expected == "css"
    ));
    assert_eq!(m.get(&FieldId::OptionsPage), Some("opt.js"));
}

#[test]
fn test_icon_hash_is_stripped_and_file_renamed() {
    let fx = Fixture::new();
    fx.write("icons/16.png", "png");
    let hashed = fx.out("icons/16-a1b2c3d4.png");
    std::fs::create_dir_all(hashed.parent().unwrap()).unwrap();
    std::fs::write(&hashed, "png").unwrap();

    let mut m = manifest(r#"{"icons": {"16": "icons/16.png"}}"#);
    let outputs = vec![OutputRecord::file(&hashed)];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(
        m.get(&FieldId::Icon {
            size: Some("16".to_string())
        }),
        Some("icons/16.png")
    );
    assert!(fx.out("icons/16.png").is_file());
    assert!(!hashed.exists());
}

#[test]
fn test_file_wrapper_resolves_to_copied_icon() {
    let fx = Fixture::new();
    fx.write("icons/16.png", "png");
    fx.write("icons/32.png", "png");
    std::fs::create_dir_all(fx.out("icons")).unwrap();
    std::fs::write(
        fx.out("icons/16.js"),
        "var _16_default = \"./16-a1b2c3d4.png\";\nexport {\n  _16_default as default\n};\n",
    )
    .unwrap();
    std::fs::write(fx.out("icons/32.js"), r#"var a="./32-e5f6a7b8.png";export{a as default};"#)
        .unwrap();
    std::fs::write(fx.out("icons/16-a1b2c3d4.png"), "png").unwrap();
    std::fs::write(fx.out("icons/32-e5f6a7b8.png"), "png").unwrap();

    let mut m = manifest(
        r#"{"icons": {"16": "icons/16.png", "32": "icons/32.png"}, "background": {"service_worker": "bg.ts"}}"#,
    );
    // Wrappers first, then the files they re-export
    let outputs = vec![
        OutputRecord::script(fx.out("bg.js")),
        OutputRecord::file_wrapper(fx.out("icons/16.js")),
        OutputRecord::file_wrapper(fx.out("icons/32.js")),
        OutputRecord::file_asset(fx.out("icons/32-e5f6a7b8.png")),
        OutputRecord::file_asset(fx.out("icons/16-a1b2c3d4.png")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty(), "{:?}", report.mismatches);
    assert_eq!(m.get(&FieldId::ServiceWorker), Some("bg.js"));
    assert_eq!(
        m.get(&FieldId::Icon {
            size: Some("16".to_string())
        }),
        Some("icons/16.png")
    );
    assert_eq!(
        m.get(&FieldId::Icon {
            size: Some("32".to_string())
        }),
        Some("icons/32.png")
    );
    assert!(fx.out("icons/16.png").is_file());
    assert!(fx.out("icons/32.png").is_file());
    assert!(!fx.out("icons/16-a1b2c3d4.png").exists());
}

#[test]
fn test_unreadable_file_wrapper_uses_next_asset() {
    let fx = Fixture::new();
    fx.write("icons/16.png", "png");
    let mut m = manifest(r#"{"icons": {"16": "icons/16.png"}}"#);
    // Nothing on disk; the companion is found by family
    let outputs = vec![
        OutputRecord::file_wrapper(fx.out("icons/16.js")),
        OutputRecord::file_asset(fx.out("icons/16-a1b2c3d4.png")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(
        m.get(&FieldId::Icon {
            size: Some("16".to_string())
        }),
        Some("icons/16.png")
    );
}

#[test]
fn test_file_wrapper_without_asset_is_a_mismatch() {
    let fx = Fixture::new();
    fx.write("icons/16.png", "png");
    let mut m = manifest(r#"{"icons": {"16": "icons/16.png"}}"#);
    let outputs = vec![OutputRecord::file_wrapper(fx.out("icons/16.js"))];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(matches!(
        &report.mismatches[0],
        Mismatch::Family { expected, .. } if expected == "png"
    ));
}

#[test]
fn test_popup_script_attribute_is_rewritten() {
    let fx = Fixture::new();
    fx.write(
        "src/popup.html",
        r#"<html><body><script type="module" src="./app.ts"></script></body></html>"#,
    );
    let mut m = manifest(r#"{"action": {"default_popup": "src/popup.html"}}"#);
    // The emitted page is not on disk, so the source document is patched
    let outputs = vec![
        OutputRecord::html(fx.out("src/popup.html")),
        OutputRecord::new(fx.out("src/popup-x1.js"), OutputKind::EntryPoint, Loader::Html),
        OutputRecord::script(fx.out("src/app.js")),
    ];

    let (report, registry) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    assert_eq!(m.get(&FieldId::Popup), Some("src/popup.html"));
    assert_eq!(
        registry.get(&posix_path(&fx.root.join("src/app.ts"))),
        Some("src/app.js")
    );
    assert_eq!(report.documents, vec![fx.out("src/popup.html")]);
    let html = std::fs::read_to_string(fx.out("src/popup.html")).unwrap();
    assert_eq!(
        html,
        r#"<html><body><script type="module" src="app.js"></script></body></html>"#
    );
}

#[test]
fn test_emitted_page_is_patched_in_place() {
    let fx = Fixture::new();
    fx.write(
        "pages/options.html",
        r#"<link rel='stylesheet' href='../styles/options.scss'><script src="options.ts"></script>"#,
    );
    std::fs::create_dir_all(fx.out("pages")).unwrap();
    std::fs::write(
        fx.out("pages/options.html"),
        r#"<!-- bundled --><link rel='stylesheet' href='../styles/options.scss'><script src="options.ts"></script>"#,
    )
    .unwrap();

    let mut m = manifest(r#"{"options_ui": {"page": "pages/options.html", "open_in_tab": true}}"#);
    let outputs = vec![
        OutputRecord::html(fx.out("pages/options.html")),
        OutputRecord::style(fx.out("styles/options.css")),
        OutputRecord::script(fx.out("pages/options.js")),
    ];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    assert!(report.mismatches.is_empty());
    let html = std::fs::read_to_string(fx.out("pages/options.html")).unwrap();
    assert_eq!(
        html,
        r#"<!-- bundled --><link rel='stylesheet' href='../styles/options.css'><script src="options.js"></script>"#
    );
}

#[test]
fn test_page_without_emitted_document_is_copied() {
    let fx = Fixture::new();
    fx.write("popup.html", r#"<script src="popup.ts"></script>"#);
    let mut m = manifest(r#"{"action": {"default_popup": "popup.html"}}"#);
    let outputs = vec![OutputRecord::script(fx.out("popup.js"))];

    let (report, _) = fx.reconcile(&mut m, &outputs);

    // The page itself had no output of its own
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(m.get(&FieldId::Popup), Some("popup.html"));
    let html = std::fs::read_to_string(fx.out("popup.html")).unwrap();
    assert_eq!(html, r#"<script src="popup.js"></script>"#);
}

#[test]
fn test_output_family() {
    assert_eq!(output_family("/p/a.tsx"), "js");
    assert_eq!(output_family("/p/a.scss"), "css");
    assert_eq!(output_family("/p/a.HTM"), "html");
    assert_eq!(output_family("/p/icon.png"), "png");
    assert!(family_matches("html", Path::new("/d/a.htm")));
    assert!(!family_matches("css", Path::new("/d/a.js")));
}

#[test]
fn test_replace_attribute_matches_whole_values() {
    let html = r#"<script src="app.ts"></script><script src="my-app.ts"></script>"#;
    assert_eq!(
        replace_attribute(html, "app.ts", "app.js"),
        r#"<script src="app.js"></script><script src="my-app.ts"></script>"#
    );
}
