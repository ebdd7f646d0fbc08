//! Catalog Tests
//!
//! Resolution across compiled-in and on-disk representations.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use upgrade_catalog::{BuiltinStrategy, CatalogError, IndexFileStrategy, PatchCatalog};
use upgrade_patch::{Mode, PatchOutcome, Version};
use upgrade_test_utils::{builtin, tag, CallLog, CountingStrategy, ScriptedPatch};

fn write_index(root: &std::path::Path, tag: &str, file: &str, contents: &str) {
    let dir = root.join(tag);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), contents).unwrap();
}

fn descriptions(resolved: &[upgrade_catalog::ResolvedPatch]) -> Vec<String> {
    resolved.iter().map(|r| r.description().to_string()).collect()
}

#[tokio::test]
async fn mixed_representations_resolve_in_version_order() {
    let patches = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();
    write_index(
        patches.path(),
        "1.10.0",
        "index.yaml",
        "patches:\n  - description: yaml ten\n    action: delete_file\n    path: old.txt\n",
    );
    write_index(
        patches.path(),
        "1.9.0",
        "index.json",
        r#"{"patches":[{"description":"json nine","action":"delete_file","path":"old.txt"}]}"#,
    );
    fs::create_dir(patches.path().join("drafts")).unwrap();

    let log = CallLog::new();
    let compiled = builtin([("1.2.0", ScriptedPatch::applying("builtin two", &log))]);
    let catalog = PatchCatalog::with_defaults(compiled, Some(patches.path().to_path_buf()), project.path());

    let resolved = catalog.resolve_applicable(&Version::new(1, 0, 0)).await.unwrap();

    assert_eq!(descriptions(&resolved), ["builtin two", "json nine", "yaml ten"]);
    assert_eq!(
        resolved.iter().map(|r| r.version.to_string()).collect::<Vec<_>>(),
        ["1.2.0", "1.9.0", "1.10.0"]
    );

    // Declarative patches are bound to the project root
    let outcome = resolved[1].patch.apply(Mode::Check).await.unwrap();
    assert_eq!(outcome, PatchOutcome::skip("file not found"));
}

#[tokio::test]
async fn builtin_set_shadows_index_file() {
    let patches = TempDir::new().unwrap();
    write_index(
        patches.path(),
        "1.1.0",
        "index.json",
        r#"{"patches":[{"description":"from disk","action":"delete_file","path":"x"}]}"#,
    );

    let log = CallLog::new();
    let counting = CountingStrategy::new(builtin([("1.1.0", ScriptedPatch::applying("compiled", &log))]));
    let catalog = PatchCatalog::new()
        .with_strategy(IndexFileStrategy::json(patches.path(), patches.path()))
        .with_strategy(counting.clone());

    assert_eq!(catalog.strategy_names(), ["counting", "json_index"]);

    let resolved = catalog.resolve_applicable(&Version::new(1, 0, 0)).await.unwrap();
    assert_eq!(descriptions(&resolved), ["compiled"]);
    assert_eq!(counting.tags_calls(), 1);
    assert_eq!(counting.resolve_calls(), 1);
}

#[tokio::test]
async fn broken_index_falls_back_to_yaml() {
    let patches = TempDir::new().unwrap();
    write_index(patches.path(), "2.0.0", "index.json", "[1, 2");
    write_index(
        patches.path(),
        "2.0.0",
        "index.yaml",
        "patches:\n  - description: from yaml\n    action: write_file\n    path: .nvmrc\n    contents: \"20\"\n",
    );

    let catalog = PatchCatalog::with_defaults(
        BuiltinStrategy::new(),
        Some(patches.path().to_path_buf()),
        patches.path(),
    );

    let set = catalog.resolve_tag(&tag("2.0.0")).await.unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set[0].description(), "from yaml");
}

#[tokio::test]
async fn every_miss_is_reported() {
    let patches = TempDir::new().unwrap();
    write_index(patches.path(), "2.0.0", "index.json", "[1, 2");

    let catalog = PatchCatalog::with_defaults(
        BuiltinStrategy::new(),
        Some(patches.path().to_path_buf()),
        patches.path(),
    );

    let err = catalog.resolve_applicable(&Version::new(1, 0, 0)).await.unwrap_err();
    assert_eq!(err.tag(), Some("2.0.0"));
    let CatalogError::PatchResolution { attempts, .. } = err else {
        panic!("expected resolution error");
    };
    assert_eq!(
        attempts.iter().map(|a| a.strategy).collect::<Vec<_>>(),
        ["builtin", "json_index", "yaml_index"]
    );
    assert_eq!(attempts[0].reason, "not present");
    assert!(attempts[1].reason.starts_with("malformed index"));
}

#[tokio::test]
async fn build_metadata_directories_are_rejected() {
    let patches = TempDir::new().unwrap();
    write_index(
        patches.path(),
        "1.1.0",
        "index.json",
        r#"{"patches":[{"description":"plain","action":"delete_file","path":"x"}]}"#,
    );
    write_index(
        patches.path(),
        "1.1.0+hotfix",
        "index.json",
        r#"{"patches":[{"description":"hotfix","action":"delete_file","path":"y"}]}"#,
    );

    let catalog = PatchCatalog::with_defaults(
        BuiltinStrategy::new(),
        Some(patches.path().to_path_buf()),
        patches.path(),
    );

    let err = catalog.resolve_applicable(&Version::new(1, 0, 0)).await.unwrap_err();
    let CatalogError::AmbiguousTag { first, second } = err else {
        panic!("expected ambiguous tag error, got {err:?}");
    };
    let mut names = [first, second];
    names.sort();
    assert_eq!(names, ["1.1.0".to_string(), "1.1.0+hotfix".to_string()]);
}

fn version_strategy() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..3, 0u64..12, 0u64..12)
}

proptest! {
    #[test]
    fn resolved_tags_are_ascending_and_at_least_recorded(
        tags in prop::collection::vec(version_strategy(), 0..12),
        recorded in version_strategy(),
    ) {
        let log = CallLog::new();
        let compiled = tags.iter().fold(BuiltinStrategy::new(), |registry, (major, minor, patch)| {
            let raw = format!("{major}.{minor}.{patch}");
            registry.with_patch(tag(&raw), ScriptedPatch::skipping(raw.clone(), &log))
        });
        let catalog = PatchCatalog::new().with_strategy(compiled);
        let recorded = Version::new(recorded.0, recorded.1, recorded.2);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let resolved = runtime.block_on(catalog.resolve_applicable(&recorded)).unwrap();

        let versions: Vec<Version> = resolved.iter().map(|r| r.version.version().clone()).collect();
        prop_assert!(versions.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(versions.iter().all(|v| *v >= recorded));

        let expected = tags
            .iter()
            .filter(|(major, minor, patch)| Version::new(*major, *minor, *patch) >= recorded)
            .count();
        prop_assert_eq!(resolved.len(), expected);
    }
}
