//! Orchestrator Tests
//!
//! End-to-end runs against an in-memory project.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use upgrade_catalog::{CatalogError, IndexFileStrategy, PatchCatalog};
use upgrade_core::prelude::*;
use upgrade_core::{Annotation, PatchReport};
use upgrade_patch::PatchError;
use upgrade_test_utils::{
    builtin, package_json_at, Behavior, CallLog, CountingStrategy, Harness, LogLine, MemoryProject,
    ScriptedPatch,
};

fn catalog(strategy: &CountingStrategy) -> PatchCatalog {
    PatchCatalog::new().with_strategy(strategy.clone())
}

#[tokio::test]
async fn current_project_is_not_resolved_or_written() {
    for recorded in ["1.2.0", "1.3.0"] {
        let log = CallLog::new();
        let strategy = CountingStrategy::new(builtin([("1.2.0", ScriptedPatch::applying("p", &log))]));
        let harness = Harness::new(MemoryProject::new(package_json_at(recorded)), "1.2.0");
        let orchestrator = harness.orchestrator(catalog(&strategy));

        for mode in [Mode::Check, Mode::Apply] {
            let result = orchestrator.run(mode).await.unwrap();
            assert_eq!(result, MigrationResult::UpToDate);
        }

        assert_eq!(strategy.tags_calls(), 0);
        assert_eq!(strategy.resolve_calls(), 0);
        assert!(log.is_empty());
        assert_eq!(harness.project.write_count(), 0);
        assert!(harness.logger.lines().is_empty());
    }
}

#[tokio::test]
async fn prerelease_record_is_behind_release() {
    let log = CallLog::new();
    let patches = builtin([("1.2.0", ScriptedPatch::applying("p", &log))]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.2.0-beta.1")), "1.2.0");

    let result = harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Check)
        .await
        .unwrap();

    assert!(result.fixable());
}

#[tokio::test]
async fn no_applicable_tags_is_up_to_date() {
    let log = CallLog::new();
    let strategy = CountingStrategy::new(builtin([("0.9.0", ScriptedPatch::applying("old", &log))]));
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "2.0.0");

    let result = harness.orchestrator(catalog(&strategy)).run(Mode::Apply).await.unwrap();

    assert_eq!(result, MigrationResult::UpToDate);
    assert_eq!(strategy.tags_calls(), 1);
    assert_eq!(strategy.resolve_calls(), 0);
    assert!(log.is_empty());
    assert_eq!(harness.project.write_count(), 0);
    assert_eq!(harness.project.recorded_version("skuba").as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn check_with_every_patch_skipping_is_up_to_date() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.1.0", ScriptedPatch::skipping("a", &log)),
        ("1.2.0", ScriptedPatch::new("b", Behavior::Skip(Some("exists".into())), &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");

    let result = harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Check)
        .await
        .unwrap();

    assert_eq!(result, MigrationResult::UpToDate);
    assert_eq!(log.count(Mode::Check), 2);
    assert_eq!(log.count(Mode::Apply), 0);
    assert_eq!(harness.project.write_count(), 0);
    assert!(harness.logger.warnings().is_empty());
}

#[tokio::test]
async fn check_with_pending_patch_is_fixable() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.1.0", ScriptedPatch::skipping("a", &log)),
        ("1.2.0", ScriptedPatch::applying("b", &log)),
        ("1.2.0", ScriptedPatch::applying("c", &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");

    let result = harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Check)
        .await
        .unwrap();

    assert!(!result.ok());
    assert_eq!(
        result.annotations(),
        [Annotation {
            path: harness.project.path().to_path_buf(),
            message: "skuba has patches to apply. Run pnpm exec skuba format to run them.".to_string(),
        }]
    );
    assert_eq!(
        harness.logger.warnings(),
        ["skuba has patches to apply. Run *pnpm exec skuba format* to run them. ~skuba-patches~"]
    );
    assert_eq!(log.count(Mode::Apply), 0);
    assert_eq!(harness.project.write_count(), 0);
    assert_eq!(harness.project.recorded_version("skuba").as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn check_runs_patches_concurrently() {
    let log = CallLog::new();
    let barrier = Arc::new(Barrier::new(2));
    let patches = builtin([
        ("1.1.0", ScriptedPatch::meeting("first", &barrier, &log)),
        ("1.2.0", ScriptedPatch::meeting("second", &barrier, &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");
    let orchestrator = harness.orchestrator(PatchCatalog::new().with_strategy(patches));

    let result = tokio::time::timeout(Duration::from_secs(5), orchestrator.run(Mode::Check))
        .await
        .expect("check patches never ran at the same time")
        .unwrap();

    assert!(result.fixable());
    assert_eq!(log.count(Mode::Check), 2);
}

#[tokio::test]
async fn apply_runs_in_semver_order_and_writes_once() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.10.0", ScriptedPatch::applying("ten", &log)),
        ("1.9.0", ScriptedPatch::applying("nine", &log)),
        ("1.1.0", ScriptedPatch::applying("one-a", &log)),
        ("1.1.0", ScriptedPatch::skipping("one-b", &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "2.0.0");

    let result = harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Apply)
        .await
        .unwrap();

    assert_eq!(log.descriptions(Mode::Apply), ["one-a", "one-b", "nine", "ten"]);
    assert_eq!(log.count(Mode::Check), 0);
    assert_eq!(
        result.reports().iter().map(|r| r.version.as_str()).collect::<Vec<_>>(),
        ["1.1.0", "1.1.0", "1.9.0", "1.10.0"]
    );

    assert_eq!(harness.project.write_count(), 1);
    let writes = harness.project.writes();
    assert_eq!(writes[0].0.as_path(), harness.project.path());
    assert_eq!(harness.project.recorded_version("skuba").as_deref(), Some("2.0.0"));
}

#[tokio::test]
async fn tag_equal_to_recorded_version_runs_again() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.0.0", ScriptedPatch::applying("initial", &log)),
        ("1.1.0", ScriptedPatch::applying("next", &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.1.0")), "1.2.0");

    harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Apply)
        .await
        .unwrap();

    assert_eq!(log.descriptions(Mode::Apply), ["next"]);
}

#[tokio::test]
async fn failing_patch_aborts_without_writing() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.1.0", ScriptedPatch::applying("first", &log)),
        ("1.1.0", ScriptedPatch::failing("second", "disk full", &log)),
        ("1.2.0", ScriptedPatch::applying("third", &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");

    let err = harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Apply)
        .await
        .unwrap_err();

    assert!(err.is_patch_failure());
    assert!(matches!(
        err.into_patch_error(),
        Some(PatchError::Failed(message)) if message == "disk full"
    ));
    assert_eq!(log.descriptions(Mode::Apply), ["first", "second"]);
    assert_eq!(harness.project.write_count(), 0);
    assert_eq!(harness.project.recorded_version("skuba").as_deref(), Some("1.0.0"));
    assert!(!harness
        .logger
        .plain_lines()
        .contains(&"skuba update complete.".to_string()));
}

#[tokio::test]
async fn failing_check_propagates() {
    let log = CallLog::new();
    let patches = builtin([("1.1.0", ScriptedPatch::failing("broken", "unreadable", &log))]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.1.0");

    let err = harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Check)
        .await
        .unwrap_err();

    assert!(err.is_patch_failure());
    assert_eq!(harness.project.write_count(), 0);
}

#[tokio::test]
async fn second_apply_is_a_no_op() {
    let log = CallLog::new();
    let strategy = CountingStrategy::new(builtin([
        ("1.1.0", ScriptedPatch::once("a", &log)),
        ("1.2.0", ScriptedPatch::once("b", &log)),
    ]));
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");
    let orchestrator = harness.orchestrator(catalog(&strategy));

    let first = orchestrator.run(Mode::Apply).await.unwrap();
    assert_eq!(first.reports().len(), 2);
    let resolved_after_first = strategy.resolve_calls();

    let second = orchestrator.run(Mode::Apply).await.unwrap();
    assert_eq!(second, MigrationResult::UpToDate);
    assert_eq!(strategy.resolve_calls(), resolved_after_first);
    assert_eq!(harness.project.write_count(), 1);
    assert_eq!(log.count(Mode::Apply), 2);

    assert_eq!(orchestrator.run(Mode::Check).await.unwrap(), MigrationResult::UpToDate);
}

#[tokio::test]
async fn missing_record_starts_from_default_version() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.0.0", ScriptedPatch::applying("baseline", &log)),
        ("1.1.0", ScriptedPatch::applying("next", &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(json!({ "name": "my-service" })), "1.1.0");

    harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Apply)
        .await
        .unwrap();

    assert_eq!(log.descriptions(Mode::Apply), ["baseline", "next"]);
    assert_eq!(
        harness.project.package_json().unwrap(),
        json!({ "name": "my-service", "skuba": { "version": "1.1.0" } })
    );
}

#[tokio::test]
async fn missing_record_at_default_version_is_up_to_date() {
    let harness = Harness::new(MemoryProject::new(json!({ "name": "my-service" })), "1.0.0");

    let result = harness.orchestrator(PatchCatalog::new()).run(Mode::Apply).await.unwrap();

    assert_eq!(result, MigrationResult::UpToDate);
    assert_eq!(harness.project.write_count(), 0);
}

#[tokio::test]
async fn upgrade_from_1_0_0_to_1_2_0() {
    let log = CallLog::new();
    let patches = builtin([
        ("1.1.0", ScriptedPatch::new("Add .nvmrc", Behavior::Skip(None), &log)),
        ("1.2.0", ScriptedPatch::once("Upgrade Node.js to 20", &log)),
    ]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");
    let orchestrator = harness.orchestrator(PatchCatalog::new().with_strategy(patches));

    assert!(orchestrator.run(Mode::Check).await.unwrap().fixable());

    let result = orchestrator.run(Mode::Apply).await.unwrap();
    assert_eq!(
        result.reports(),
        [
            PatchReport {
                version: "1.1.0".to_string(),
                description: "Add .nvmrc".to_string(),
                outcome: PatchOutcome::skipped(),
            },
            PatchReport {
                version: "1.2.0".to_string(),
                description: "Upgrade Node.js to 20".to_string(),
                outcome: PatchOutcome::Apply,
            },
        ]
    );
    assert_eq!(
        harness.logger.lines(),
        [
            LogLine::Warn(
                "skuba has patches to apply. Run *pnpm exec skuba format* to run them. ~skuba-patches~"
                    .to_string()
            ),
            LogLine::Plain("Updating skuba...".to_string()),
            LogLine::Newline,
            LogLine::Plain("Patch skipped: Add .nvmrc".to_string()),
            LogLine::Newline,
            LogLine::Plain("Patch applied: Upgrade Node.js to 20".to_string()),
            LogLine::Newline,
            LogLine::Plain("skuba update complete.".to_string()),
            LogLine::Newline,
        ]
    );
    assert_eq!(
        harness.project.package_json().unwrap(),
        json!({
            "name": "my-service",
            "skuba": { "template": "express-rest-api", "version": "1.2.0" }
        })
    );
    assert_eq!(harness.project.write_count(), 1);
}

#[tokio::test]
async fn skip_reason_is_logged() {
    let log = CallLog::new();
    let patches = builtin([(
        "1.1.0",
        ScriptedPatch::new("Add .nvmrc", Behavior::Skip(Some("file exists".into())), &log),
    )]);
    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.1.0");

    harness
        .orchestrator(PatchCatalog::new().with_strategy(patches))
        .run(Mode::Apply)
        .await
        .unwrap();

    assert!(harness
        .logger
        .plain_lines()
        .contains(&"Patch skipped: Add .nvmrc - file exists".to_string()));
}

#[tokio::test]
async fn missing_manifest_fails() {
    let harness = Harness::new(MemoryProject::empty(), "1.2.0");

    let err = harness.orchestrator(PatchCatalog::new()).run(Mode::Check).await.unwrap_err();

    assert!(matches!(err, UpgradeError::ManifestNotFound));
}

#[tokio::test]
async fn malformed_record_fails() {
    let harness = Harness::new(MemoryProject::new(json!({ "skuba": { "version": "latest" } })), "1.2.0");

    let err = harness.orchestrator(PatchCatalog::new()).run(Mode::Check).await.unwrap_err();

    assert!(matches!(err, UpgradeError::InvalidVersion { field: "recorded version", .. }));
}

#[tokio::test]
async fn unresolvable_tag_fails_without_writing() {
    let patches_root = tempfile::TempDir::new().unwrap();
    std::fs::create_dir(patches_root.path().join("1.1.0")).unwrap();
    std::fs::write(patches_root.path().join("1.1.0").join("index.json"), "{ not json").unwrap();

    let harness = Harness::new(MemoryProject::new(package_json_at("1.0.0")), "1.2.0");
    let catalog = PatchCatalog::new().with_strategy(IndexFileStrategy::json(patches_root.path(), "/project"));

    let err = harness.orchestrator(catalog).run(Mode::Apply).await.unwrap_err();

    match err {
        UpgradeError::PatchResolution(CatalogError::PatchResolution { tag, attempts }) => {
            assert_eq!(tag, "1.1.0");
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].strategy, "json_index");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.project.write_count(), 0);
}
