use std::fs;
use std::sync::Arc;

use super::*;
use crate::constants::COLLECTION_REPO;
use crate::resolver::Resolver;
use crate::test_utils::{MockForgeClient, ScriptedPrompter, TestProject};

const OLD_SHA: &str = "0123456789abcdef0123456789abcdef01234567";
const NEW_SHA: &str = "fedcba9876543210fedcba9876543210fedcba98";

async fn install_branch_rule(project: &TestProject, forge: Arc<MockForgeClient>) {
    let ctx = project.context_with(forge, Arc::new(ScriptedPrompter::always_yes()));
    Resolver::new().install(&ctx, "alice/foo").await.unwrap();
}

fn branch_forge() -> MockForgeClient {
    MockForgeClient::new()
        .with_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "foo.mdc", b"# v1")
        .with_head("alice", COLLECTION_REPO, DEFAULT_BRANCH, OLD_SHA)
}

#[tokio::test]
async fn branch_upgrade_is_noop_when_head_unchanged() {
    let project = TestProject::new();
    let forge = Arc::new(branch_forge());
    install_branch_rule(&project, forge.clone()).await;

    let ctx = project.context_with(forge, Arc::new(ScriptedPrompter::always_yes()));
    let outcome = UpgradeEngine::new().upgrade(&ctx, "alice/foo").await.unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::UpToDate {
            key: "alice/foo".to_string(),
        }
    );
    assert_eq!(fs::read(ctx.rules_dir.join("alice/foo.mdc")).unwrap(), b"# v1");
}

#[tokio::test]
async fn branch_upgrade_applies_new_head() {
    let project = TestProject::new();
    let forge = Arc::new(branch_forge());
    install_branch_rule(&project, forge.clone()).await;

    forge.update_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "foo.mdc", b"# v2");
    forge.update_head("alice", COLLECTION_REPO, DEFAULT_BRANCH, NEW_SHA);

    let ctx = project.context_with(forge.clone(), Arc::new(ScriptedPrompter::always_yes()));
    let outcome = UpgradeEngine::new().upgrade(&ctx, "alice/foo").await.unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            key: "alice/foo".to_string(),
            new_commit: Some(NEW_SHA.to_string()),
        }
    );
    assert_eq!(fs::read(ctx.rules_dir.join("alice/foo.mdc")).unwrap(), b"# v2");

    let lockfile = ctx.store().load().unwrap();
    let record = lockfile.get("alice/foo").unwrap();
    assert_eq!(record.resolved_commit.as_deref(), Some(NEW_SHA));
    assert_eq!(
        record.content_sha256.as_deref(),
        Some(crate::lockfile::checksum::checksum_bytes(b"# v2").as_str())
    );

    // Running again is monotone: the head has not advanced further.
    let second = UpgradeEngine::new().upgrade(&ctx, "alice/foo").await.unwrap();
    assert_eq!(
        second,
        UpgradeOutcome::UpToDate {
            key: "alice/foo".to_string(),
        }
    );
}

#[tokio::test]
async fn declined_overwrite_cancels_and_preserves_edits() {
    let project = TestProject::new();
    let forge = Arc::new(branch_forge());
    install_branch_rule(&project, forge.clone()).await;

    // Local edit.
    let artifact = project.rules_dir().join("alice/foo.mdc");
    fs::write(&artifact, b"# my local tweaks").unwrap();

    forge.update_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "foo.mdc", b"# v2");
    forge.update_head("alice", COLLECTION_REPO, DEFAULT_BRANCH, NEW_SHA);

    let prompter = Arc::new(ScriptedPrompter::always_no());
    let ctx = project.context_with(forge, prompter.clone());
    let lock_before = fs::read_to_string(ctx.store().configured_path()).unwrap();

    let outcome = UpgradeEngine::new().upgrade(&ctx, "alice/foo").await.unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::Cancelled {
            key: "alice/foo".to_string(),
        }
    );
    assert_eq!(fs::read(&artifact).unwrap(), b"# my local tweaks");
    assert_eq!(
        fs::read_to_string(ctx.store().configured_path()).unwrap(),
        lock_before
    );
    assert_eq!(prompter.calls(), vec!["overwrite:alice/foo.mdc".to_string()]);
}

#[tokio::test]
async fn pinned_rule_requires_unpin_confirmation() {
    let project = TestProject::new();
    let forge = Arc::new(
        MockForgeClient::new()
            .with_file("alice", COLLECTION_REPO, "abc1234", "foo.mdc", b"# pinned")
            .with_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "foo.mdc", b"# head")
            .with_head("alice", COLLECTION_REPO, DEFAULT_BRANCH, NEW_SHA),
    );
    let ctx = project.context_with(forge.clone(), Arc::new(ScriptedPrompter::always_yes()));
    Resolver::new().install(&ctx, "alice/foo:abc1234").await.unwrap();

    // Refusal keeps the pin.
    let no_ctx = project.context_with(forge.clone(), Arc::new(ScriptedPrompter::always_no()));
    let outcome = UpgradeEngine::new()
        .upgrade(&no_ctx, "alice/foo-abc1234")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::Cancelled {
            key: "alice/foo-abc1234".to_string(),
        }
    );
    let record = no_ctx.store().load().unwrap().get("alice/foo-abc1234").cloned().unwrap();
    assert_eq!(record.git_ref, Some(GitRef::Commit("abc1234".to_string())));

    // Acceptance unpins onto the default branch.
    let outcome = UpgradeEngine::new().upgrade(&ctx, "alice/foo-abc1234").await.unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            key: "alice/foo-abc1234".to_string(),
            new_commit: Some(NEW_SHA.to_string()),
        }
    );
    let record = ctx.store().load().unwrap().get("alice/foo-abc1234").cloned().unwrap();
    assert_eq!(
        record.git_ref,
        Some(GitRef::Branch(DEFAULT_BRANCH.to_string()))
    );
    assert_eq!(
        fs::read(ctx.rules_dir.join("alice/foo-abc1234.mdc")).unwrap(),
        b"# head"
    );
}

#[tokio::test]
async fn builtin_upgrade_rereads_the_registry() {
    let project = TestProject::new();
    let ctx = project.context();
    Resolver::new().install(&ctx, "monorepo").await.unwrap();

    // Simulate drift on disk; the registry content wins.
    let artifact = ctx.rules_dir.join("built-in/monorepo.mdc");
    fs::write(&artifact, b"stale").unwrap();

    let outcome = UpgradeEngine::new()
        .upgrade(&ctx, "built-in/monorepo")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            key: "built-in/monorepo".to_string(),
            new_commit: None,
        }
    );
    let content = fs::read_to_string(&artifact).unwrap();
    assert!(content.contains("Monorepo conventions"));
}

#[tokio::test]
async fn local_rules_skip_with_diagnostic() {
    let project = TestProject::new();
    project.write_file("rules/own.mdc", b"# mine");
    let ctx = project.context();
    Resolver::new().install(&ctx, "./rules/own.mdc").await.unwrap();

    let outcome = UpgradeEngine::new()
        .upgrade(&ctx, "local/rel/rules-own")
        .await
        .unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::SkippedLocal {
            key: "local/rel/rules-own".to_string(),
        }
    );
}

#[tokio::test]
async fn unknown_key_is_an_error() {
    let project = TestProject::new();
    let ctx = project.context();
    let error = UpgradeEngine::new().upgrade(&ctx, "nope/nope").await.unwrap_err();
    assert!(matches!(
        error.downcast_ref::<RulesError>(),
        Some(RulesError::RuleNotFound { .. })
    ));
}

#[tokio::test]
async fn outdated_reports_only_advanced_heads() {
    let project = TestProject::new();
    let forge = Arc::new(branch_forge());
    install_branch_rule(&project, forge.clone()).await;

    let ctx = project.context_with(forge.clone(), Arc::new(ScriptedPrompter::always_yes()));
    let engine = UpgradeEngine::new();

    let report = engine.check_outdated(&ctx).await.unwrap();
    assert!(report.outdated.is_empty());

    forge.update_head("alice", COLLECTION_REPO, DEFAULT_BRANCH, NEW_SHA);
    let report = engine.check_outdated(&ctx).await.unwrap();
    assert_eq!(report.outdated.len(), 1);
    assert_eq!(report.outdated[0].key, "alice/foo");
    assert_eq!(report.outdated[0].current.as_deref(), Some(OLD_SHA));
    assert_eq!(report.outdated[0].latest.as_deref(), Some(NEW_SHA));

    // Nothing was modified by the check.
    assert_eq!(fs::read(ctx.rules_dir.join("alice/foo.mdc")).unwrap(), b"# v1");
}

#[tokio::test]
async fn outdated_flags_builtin_content_changes() {
    let project = TestProject::new();
    let ctx = project.context();
    Resolver::new().install(&ctx, "monorepo").await.unwrap();

    let engine = UpgradeEngine::new();
    let report = engine.check_outdated(&ctx).await.unwrap();
    assert!(report.outdated.is_empty());

    // Simulate an older install whose recorded hash predates the current
    // registry content.
    let store = ctx.store();
    let mut lockfile = store.load().unwrap();
    lockfile.get_mut("built-in/monorepo").unwrap().content_sha256 =
        Some("0".repeat(64));
    store.save(&mut lockfile).unwrap();

    let report = engine.check_outdated(&ctx).await.unwrap();
    assert_eq!(report.outdated.len(), 1);
    assert_eq!(report.outdated[0].key, "built-in/monorepo");
    assert!(report.outdated[0].latest.is_none());
}

#[tokio::test]
async fn upgrade_all_aborts_on_refusal() {
    let project = TestProject::new();
    let forge = Arc::new(
        branch_forge().with_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "bar.mdc", b"# bar"),
    );
    let ctx = project.context_with(forge.clone(), Arc::new(ScriptedPrompter::always_yes()));
    let resolver = Resolver::new();
    resolver.install(&ctx, "alice/foo").await.unwrap();
    resolver.install(&ctx, "alice/bar").await.unwrap();

    // Both rules drift upstream and locally.
    forge.update_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "foo.mdc", b"# v2");
    forge.update_file("alice", COLLECTION_REPO, DEFAULT_BRANCH, "bar.mdc", b"# v2");
    forge.update_head("alice", COLLECTION_REPO, DEFAULT_BRANCH, NEW_SHA);
    fs::write(project.rules_dir().join("alice/foo.mdc"), b"edited").unwrap();

    let ctx = project.context_with(forge, Arc::new(ScriptedPrompter::always_no()));
    let report = UpgradeEngine::new().upgrade_all(&ctx, None).await.unwrap();

    assert!(report.aborted);
    // The refusal on the first rule stops the run before the second.
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(
        report.outcomes[0].1,
        UpgradeOutcome::Cancelled {
            key: "alice/foo".to_string(),
        }
    );
}
