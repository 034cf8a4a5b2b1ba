//! End-to-end install scenarios driven through the library surface.

mod common;

use std::fs;
use std::sync::Arc;

use common::{HEAD_A, context, forge_with_alice_foo};
use cursor_rules_cli::constants::{COLLECTION_REPO, LOCKFILE_NAME};
use cursor_rules_cli::models::{GitRef, SourceType};
use cursor_rules_cli::reference::key::canonical_key;
use cursor_rules_cli::resolver::{InstallOutcome, Resolver};
use cursor_rules_cli::test_utils::{MockForgeClient, TestProject};

#[tokio::test]
async fn local_single_file_installs_byte_for_byte() {
    let project = TestProject::new();
    let source = project.write_file("incoming/monorepo.mdc", b"---\ndescription: x\n---\nbody\n");
    let ctx = context(&project, Arc::new(MockForgeClient::new()));

    let outcome = Resolver::new()
        .install(&ctx, &source.to_string_lossy())
        .await
        .unwrap();
    let InstallOutcome::Installed(record) = outcome else {
        panic!("expected an install");
    };

    assert_eq!(record.source_type, SourceType::LocalAbsolute);
    let segments: Vec<&str> = record.key.split('/').collect();
    assert_eq!(segments[0], "local");
    assert_eq!(segments[1], "abs");
    assert_eq!(segments[2].len(), 8);
    assert!(segments[2].chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(segments[3], "monorepo");

    let installed = ctx.rules_dir.join(format!("{}.mdc", record.key));
    assert_eq!(fs::read(&installed).unwrap(), fs::read(&source).unwrap());

    let lockfile = ctx.store().load().unwrap();
    assert_eq!(lockfile.rules.len(), 1);
}

#[tokio::test]
async fn shorthand_records_branch_and_resolved_commit() {
    let project = TestProject::new();
    let ctx = context(&project, Arc::new(forge_with_alice_foo()));

    let outcome = Resolver::new().install(&ctx, "alice/foo").await.unwrap();
    let InstallOutcome::Installed(record) = outcome else {
        panic!("expected an install");
    };

    assert_eq!(record.key, "alice/foo");
    assert_eq!(record.source_type, SourceType::ForgeShorthand);
    assert_eq!(record.git_ref, Some(GitRef::Branch("main".to_string())));
    assert_eq!(record.resolved_commit.as_deref(), Some(HEAD_A));
    assert_eq!(
        fs::read_to_string(ctx.rules_dir.join("alice/foo.mdc")).unwrap(),
        "# foo"
    );
}

#[tokio::test]
async fn pinned_shorthand_keys_carry_the_pin() {
    let project = TestProject::new();
    let forge = MockForgeClient::new().with_file(
        "alice",
        COLLECTION_REPO,
        "abc1234",
        "foo.mdc",
        b"# pinned",
    );
    let ctx = context(&project, Arc::new(forge));

    let outcome = Resolver::new()
        .install(&ctx, "alice/foo:abc1234")
        .await
        .unwrap();
    let InstallOutcome::Installed(record) = outcome else {
        panic!("expected an install");
    };
    assert_eq!(record.key, "alice/foo-abc1234");
    assert_eq!(record.git_ref, Some(GitRef::Commit("abc1234".to_string())));
    assert!(record.resolved_commit.is_none());
}

#[tokio::test]
async fn local_glob_skips_non_rule_files() {
    let project = TestProject::new();
    project.write_file("rules/a.mdc", b"# a");
    project.write_file("rules/b.mdc", b"# b");
    project.write_file("rules/notes.txt", b"not a rule");
    let ctx = context(&project, Arc::new(MockForgeClient::new()));

    let outcome = Resolver::new().install(&ctx, "./rules/*.mdc").await.unwrap();
    assert_eq!(
        outcome,
        InstallOutcome::GlobCompleted {
            added: 2,
            skipped: 0,
            errored: 0,
        }
    );

    let lockfile = ctx.store().load().unwrap();
    assert_eq!(lockfile.rules.len(), 2);
    assert!(lockfile.rules.iter().all(|r| r.source_type == SourceType::LocalRelative));
}

#[tokio::test]
async fn reinstalling_a_glob_skips_existing_keys() {
    let project = TestProject::new();
    project.write_file("rules/a.mdc", b"# a");
    let ctx = context(&project, Arc::new(MockForgeClient::new()));
    let resolver = Resolver::new();

    resolver.install(&ctx, "./rules/*.mdc").await.unwrap();
    project.write_file("rules/b.mdc", b"# b");
    let second = resolver.install(&ctx, "./rules/*.mdc").await.unwrap();

    assert_eq!(
        second,
        InstallOutcome::GlobCompleted {
            added: 1,
            skipped: 1,
            errored: 0,
        }
    );
}

#[tokio::test]
async fn lockfile_mirror_invariant_holds_after_installs() {
    let project = TestProject::new();
    project.write_file("rules/a.mdc", b"# a");
    let ctx = context(&project, Arc::new(forge_with_alice_foo()));
    let resolver = Resolver::new();

    resolver.install(&ctx, "alice/foo").await.unwrap();
    resolver.install(&ctx, "./rules/a.mdc").await.unwrap();

    let raw = fs::read_to_string(ctx.rules_dir.join(LOCKFILE_NAME)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let installed: Vec<&str> = json["installed"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    let rule_keys: Vec<&str> = json["rules"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["key"].as_str().unwrap())
        .collect();
    assert_eq!(installed, rule_keys);
    assert_eq!(installed, vec!["alice/foo", "local/rel/rules-a"]);
}

#[test]
fn classification_boundaries_hold() {
    let project = TestProject::new();
    let base = project.root();

    // Extensions defeat shorthand shape.
    assert_eq!(
        canonical_key("user/rule.mdc", base),
        "local/rel/user-rule"
    );
    // Globs classify ahead of shorthand shapes.
    assert_eq!(canonical_key("user/*.mdc", base), "local/rel/user-to-glob");
    // A local directory named like a user wins over shorthand.
    project.write_file("alice/foo", b"data");
    assert_eq!(canonical_key("alice/foo", base), "local/rel/alice-foo");
}
