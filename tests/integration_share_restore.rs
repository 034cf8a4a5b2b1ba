//! Share/restore round trips across two projects, including the
//! conflict-rename scenario.

mod common;

use std::fs;
use std::sync::Arc;

use common::{context, forge_with_alice_foo};
use cursor_rules_cli::prompt::ConflictChoice;
use cursor_rules_cli::resolver::Resolver;
use cursor_rules_cli::share;
use cursor_rules_cli::share::restore::restore;
use cursor_rules_cli::test_utils::{MockForgeClient, TestProject};

#[tokio::test]
async fn embedded_share_round_trips_by_key_and_checksum() {
    // Project A: two local rules, embedded export.
    let project_a = TestProject::new();
    project_a.write_file("rules/one.mdc", b"# one");
    project_a.write_file("rules/two.mdc", b"# two");
    let ctx_a = context(&project_a, Arc::new(MockForgeClient::new()));
    let resolver = Resolver::new();
    resolver.install(&ctx_a, "./rules/*.mdc").await.unwrap();

    let lock_a = ctx_a.store().load().unwrap();
    let (manifest, summary) = share::export(&ctx_a, true).unwrap();
    assert_eq!(summary.embedded, 2);
    assert_eq!(summary.unshareable, 0);

    // Project B restores the manifest.
    let project_b = TestProject::new();
    let path = project_b.write_file(
        "share.json",
        serde_json::to_string_pretty(&manifest).unwrap().as_bytes(),
    );
    let ctx_b = context(&project_b, Arc::new(MockForgeClient::new()));
    let report = restore(&ctx_b, &resolver, &path.to_string_lossy(), None)
        .await
        .unwrap();
    assert_eq!(report.installed, 2);
    assert_eq!(report.failed, 0);

    // Same key set, same content hashes.
    let lock_b = ctx_b.store().load().unwrap();
    let mut keys_a = lock_a.keys();
    let mut keys_b = lock_b.keys();
    keys_a.sort();
    keys_b.sort();
    assert_eq!(keys_a, keys_b);
    for record in &lock_a.rules {
        let restored = lock_b.get(&record.key).unwrap();
        assert_eq!(restored.content_sha256, record.content_sha256);
    }
}

#[tokio::test]
async fn conflicting_key_renames_with_suffix() {
    // Project A holds `alice/foo` with one content...
    let project_a = TestProject::new();
    let forge_a = MockForgeClient::new()
        .with_file(
            "alice",
            cursor_rules_cli::constants::COLLECTION_REPO,
            "main",
            "foo.mdc",
            b"# from A",
        )
        .with_head(
            "alice",
            cursor_rules_cli::constants::COLLECTION_REPO,
            "main",
            common::HEAD_A,
        );
    let ctx_a = context(&project_a, Arc::new(forge_a));
    let resolver = Resolver::new();
    resolver.install(&ctx_a, "alice/foo").await.unwrap();
    let (manifest, _) = share::export(&ctx_a, false).unwrap();

    // ...project B holds the same key with different content.
    let project_b = TestProject::new();
    let forge_b = Arc::new(
        MockForgeClient::new()
            .with_file(
                "alice",
                cursor_rules_cli::constants::COLLECTION_REPO,
                "main",
                "foo.mdc",
                b"# from B",
            )
            .with_head(
                "alice",
                cursor_rules_cli::constants::COLLECTION_REPO,
                "main",
                common::HEAD_B,
            ),
    );
    let ctx_b = context(&project_b, forge_b);
    resolver.install(&ctx_b, "alice/foo").await.unwrap();

    let path = project_b.write_file(
        "share.json",
        serde_json::to_string(&manifest).unwrap().as_bytes(),
    );
    let report = restore(
        &ctx_b,
        &resolver,
        &path.to_string_lossy(),
        Some(ConflictChoice::Rename),
    )
    .await
    .unwrap();
    assert_eq!(report.installed, 1);

    let lock_b = ctx_b.store().load().unwrap();
    assert!(lock_b.contains("alice/foo"));
    assert!(lock_b.contains("alice/foo-1"));
    assert_eq!(
        fs::read(ctx_b.rules_dir.join("alice/foo.mdc")).unwrap(),
        b"# from B"
    );
    assert!(ctx_b.rules_dir.join("alice/foo-1.mdc").exists());
}

#[tokio::test]
async fn skip_policy_preserves_the_existing_rule() {
    let project = TestProject::new();
    let ctx = context(&project, Arc::new(forge_with_alice_foo()));
    let resolver = Resolver::new();
    resolver.install(&ctx, "alice/foo").await.unwrap();
    let (manifest, _) = share::export(&ctx, false).unwrap();

    let path = project.write_file(
        "share.json",
        serde_json::to_string(&manifest).unwrap().as_bytes(),
    );
    let report = restore(
        &ctx,
        &resolver,
        &path.to_string_lossy(),
        Some(ConflictChoice::Skip),
    )
    .await
    .unwrap();

    assert_eq!(report.installed, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(ctx.store().load().unwrap().rules.len(), 1);
}
