//! End-to-end conversion against an in-process fake registry

mod common;

use common::{fake_registry, left_pad_versions, FakeVersion, LEFT_PAD};
use esmbox::core::{EsmError, ManifestUpdate, ProjectManifest};
use esmbox::package::converter::{ConvertOptions, PackageConverter};
use esmbox::package::{convert_all, AssetMode, EntryPolicy, EntryRule, PackageRequest};
use esmbox::registry::RegistryClient;
use esmbox_bundle::BackendChoice;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn native_options() -> ConvertOptions {
    ConvertOptions {
        backend: BackendChoice::Native,
        ..ConvertOptions::default()
    }
}

fn converter(project: &Path, registry: &str, options: ConvertOptions) -> PackageConverter {
    PackageConverter::new(
        project,
        &project.join("web_modules"),
        RegistryClient::new(registry),
        options,
    )
}

#[tokio::test]
async fn test_left_pad_latest_becomes_standalone_module() {
    let registry = fake_registry(vec![("left-pad", "1.3.0", left_pad_versions())]).await;
    let project = TempDir::new().unwrap();
    ProjectManifest::init(project.path()).unwrap();

    let output = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("left-pad", "latest"))
        .await
        .unwrap();

    assert_eq!(output.version, "1.3.0");
    assert_eq!(output.output_dir, project.path().join("web_modules/left-pad@1.3.0"));
    assert_eq!(output.entry_rule, Some(EntryRule::Fields));
    assert_eq!(output.manifest, ManifestUpdate::Updated);

    let bundle = fs::read_to_string(output.bundle_file.unwrap()).unwrap();
    assert!(bundle.contains("function leftPad(str, len, ch)"));
    assert!(bundle.contains("export default __esmbox_default(__esmbox_entry);"));

    let manifest = ProjectManifest::load(project.path()).unwrap().unwrap();
    assert_eq!(manifest.packages.len(), 1);
    assert_eq!(manifest.packages.get("left-pad").map(String::as_str), Some("1.3.0"));
}

#[tokio::test]
async fn test_explicit_version_and_reconversion() {
    let registry = fake_registry(vec![("left-pad", "1.3.0", left_pad_versions())]).await;
    let project = TempDir::new().unwrap();
    ProjectManifest::init(project.path()).unwrap();
    let converter = converter(project.path(), &registry, native_options());

    let first = converter
        .convert(&PackageRequest::new("left-pad", "1.1.0"))
        .await
        .unwrap();
    assert!(first.output_dir.ends_with("left-pad@1.1.0"));

    // A stale file from an earlier run does not survive reconversion
    fs::write(first.output_dir.join("stale.css"), "x").unwrap();
    let again = converter
        .convert(&PackageRequest::new("left-pad", "1.1.0"))
        .await
        .unwrap();
    assert_eq!(again.manifest, ManifestUpdate::Unchanged);
    assert!(!again.output_dir.join("stale.css").exists());
}

#[tokio::test]
async fn test_unknown_version_leaves_no_trace() {
    let registry = fake_registry(vec![("left-pad", "1.3.0", left_pad_versions())]).await;
    let project = TempDir::new().unwrap();
    ProjectManifest::init(project.path()).unwrap();

    let err = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("left-pad", "9.9.9"))
        .await
        .unwrap_err();

    assert!(matches!(err, EsmError::VersionNotFound { .. }));
    assert!(!project.path().join("web_modules").exists());
    let manifest = ProjectManifest::load(project.path()).unwrap().unwrap();
    assert!(manifest.packages.is_empty());
}

#[tokio::test]
async fn test_unknown_package_is_package_not_found() {
    let registry = fake_registry(vec![]).await;
    let project = TempDir::new().unwrap();

    let err = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("no-such-package", "latest"))
        .await
        .unwrap_err();
    assert!(matches!(err, EsmError::PackageNotFound(_)));
}

#[tokio::test]
async fn test_assets_only_package() {
    let versions = vec![FakeVersion::new(
        "2.0.0",
        &[
            ("package.json", r#"{"name": "theme"}"#),
            ("css/theme.css", "body { color: red; }"),
            ("img/logo.svg", "<svg/>"),
        ],
    )];
    let registry = fake_registry(vec![("theme", "2.0.0", versions)]).await;
    let project = TempDir::new().unwrap();

    let output = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("theme", "latest"))
        .await
        .unwrap();

    assert_eq!(output.bundle_file, None);
    assert_eq!(output.entry_rule, None);
    assert_eq!(
        output.copied_assets,
        vec![PathBuf::from("css/theme.css"), PathBuf::from("img/logo.svg")]
    );
    assert!(output.output_dir.join("css/theme.css").is_file());
    // No esmbox.json in the project: nothing to record
    assert_eq!(output.manifest, ManifestUpdate::Skipped);

    let strict = ConvertOptions {
        entry_policy: EntryPolicy::Strict,
        ..native_options()
    };
    let err = converter(project.path(), &registry, strict)
        .convert(&PackageRequest::new("theme", "latest"))
        .await
        .unwrap_err();
    assert!(matches!(err, EsmError::EntryNotFound(_)));
}

#[tokio::test]
async fn test_entry_scoped_assets_and_include_all() {
    let versions = vec![FakeVersion::new(
        "1.0.0",
        &[
            ("package.json", r#"{"name": "widget"}"#),
            ("dist/index.js", "export const widget = 1;\n"),
            ("dist/widget.css", ".w {}"),
            ("docs/screenshot.png", "png"),
        ],
    )];
    let registry = fake_registry(vec![("@demo/widget", "1.0.0", versions)]).await;
    let project = TempDir::new().unwrap();

    let scoped = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("@demo/widget", "latest"))
        .await
        .unwrap();
    assert_eq!(scoped.output_dir, project.path().join("web_modules/@demo/widget@1.0.0"));
    assert_eq!(scoped.entry_rule, Some(EntryRule::DistBuild));
    assert_eq!(scoped.copied_assets, vec![PathBuf::from("dist/widget.css")]);
    assert_eq!(scoped.excluded_assets, vec![PathBuf::from("docs/screenshot.png")]);
    assert!(!scoped.output_dir.join("docs/screenshot.png").exists());

    let bundle = fs::read_to_string(scoped.output_dir.join("bundle.js")).unwrap();
    assert!(bundle.contains("export { __esmbox_e0 as widget };"));

    let all = ConvertOptions {
        asset_mode: AssetMode::IncludeAll,
        ..native_options()
    };
    let output = converter(project.path(), &registry, all)
        .convert(&PackageRequest::new("@demo/widget", "1.0.0"))
        .await
        .unwrap();
    assert!(output.excluded_assets.is_empty());
    assert!(output.output_dir.join("docs/screenshot.png").is_file());
}

#[tokio::test]
async fn test_batch_continues_past_failures() {
    let broken = vec![FakeVersion::new("0.1.0", &[("README.md", "no package.json here")])];
    let registry = fake_registry(vec![
        ("broken", "0.1.0", broken),
        ("left-pad", "1.3.0", left_pad_versions()),
    ])
    .await;
    let project = TempDir::new().unwrap();
    ProjectManifest::init(project.path()).unwrap();

    let requests = vec![
        PackageRequest::new("broken", "latest"),
        PackageRequest::new("left-pad", "latest"),
    ];
    let results = convert_all(&converter(project.path(), &registry, native_options()), requests).await;

    assert_eq!(results.len(), 2);
    assert!(matches!(results[0].outcome, Err(EsmError::RootNotFound(_))));
    let ok = results[1].outcome.as_ref().unwrap();
    assert_eq!(ok.version, "1.3.0");

    let bundle = fs::read_to_string(ok.output_dir.join("bundle.js")).unwrap();
    assert!(bundle.contains(LEFT_PAD.lines().next().unwrap()));
}

#[tokio::test]
async fn test_failed_first_conversion_leaves_no_output() {
    let versions = vec![FakeVersion::new(
        "1.0.0",
        &[
            ("package.json", r#"{"name": "@demo/needs-react", "main": "index.js"}"#),
            ("index.js", "const React = require('react');\nmodule.exports = React;\n"),
            ("style.css", ".x {}"),
        ],
    )];
    let registry = fake_registry(vec![("@demo/needs-react", "1.0.0", versions)]).await;
    let project = TempDir::new().unwrap();
    ProjectManifest::init(project.path()).unwrap();

    let err = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("@demo/needs-react", "latest"))
        .await
        .unwrap_err();
    assert!(matches!(err, EsmError::BundleFailed(_)));

    let web_modules = project.path().join("web_modules");
    assert!(!web_modules.join("@demo/needs-react@1.0.0").exists());
    let leftovers: Vec<_> = fs::read_dir(&web_modules).unwrap().flatten().collect();
    assert!(leftovers.is_empty(), "unexpected entries: {:?}", leftovers);

    let manifest = ProjectManifest::load(project.path()).unwrap().unwrap();
    assert!(manifest.packages.is_empty());
}

#[tokio::test]
async fn test_failed_reconversion_keeps_previous_bundle() {
    let registry = fake_registry(vec![("left-pad", "1.3.0", left_pad_versions())]).await;
    let project = TempDir::new().unwrap();
    ProjectManifest::init(project.path()).unwrap();

    let first = converter(project.path(), &registry, native_options())
        .convert(&PackageRequest::new("left-pad", "1.3.0"))
        .await
        .unwrap();
    let bundle_path = first.output_dir.join("bundle.js");
    let before = fs::read_to_string(&bundle_path).unwrap();

    let missing_esbuild = ConvertOptions {
        backend: BackendChoice::Esbuild,
        esbuild_path: Some(project.path().join("no-such-esbuild")),
        ..ConvertOptions::default()
    };
    let err = converter(project.path(), &registry, missing_esbuild)
        .convert(&PackageRequest::new("left-pad", "1.3.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, EsmError::BundleFailed(_)));

    assert_eq!(fs::read_to_string(&bundle_path).unwrap(), before);
    let names: Vec<String> = fs::read_dir(project.path().join("web_modules"))
        .unwrap()
        .flatten()
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    assert_eq!(names, vec!["left-pad@1.3.0"]);

    let manifest = ProjectManifest::load(project.path()).unwrap().unwrap();
    assert_eq!(manifest.packages.get("left-pad").map(String::as_str), Some("1.3.0"));
}
