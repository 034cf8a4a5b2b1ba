//! Lockfile behaviors across the public surface: sync, relocation, and
//! legacy migration.

mod common;

use std::fs;
use std::sync::Arc;

use common::{context, forge_with_alice_foo};
use cursor_rules_cli::constants::LOCKFILE_NAME;
use cursor_rules_cli::lockfile::LockLocation;
use cursor_rules_cli::models::SourceType;
use cursor_rules_cli::resolver::Resolver;
use cursor_rules_cli::test_utils::{MockForgeClient, TestProject};

#[tokio::test]
async fn sync_adopts_manual_files_and_drops_deleted_ones() {
    let project = TestProject::new();
    let ctx = context(&project, Arc::new(forge_with_alice_foo()));
    let resolver = Resolver::new();
    resolver.install(&ctx, "alice/foo").await.unwrap();

    // The user hand-copies a rule in and deletes an installed one.
    project.write_file(".cursor/rules/manual/extra.mdc", b"# manual");
    fs::remove_file(ctx.rules_dir.join("alice/foo.mdc")).unwrap();

    let store = ctx.store();
    let mut lockfile = store.load().unwrap();
    assert!(store.sync_with_disk(&mut lockfile).unwrap());
    store.save(&mut lockfile).unwrap();

    let keys = lockfile.keys();
    assert!(keys.contains(&"manual/extra".to_string()));
    assert!(!keys.contains(&"alice/foo".to_string()));

    // Completeness: every record's files exist, every .mdc is tracked.
    for record in &lockfile.rules {
        for entry in &record.local_files {
            assert!(store.resolve_artifact(entry).exists());
        }
    }
}

#[tokio::test]
async fn relocation_preserves_bytes_in_both_directions() {
    let project = TestProject::new();
    let ctx = context(&project, Arc::new(forge_with_alice_foo()));
    Resolver::new().install(&ctx, "alice/foo").await.unwrap();

    let mut store = ctx.store();
    let original = fs::read(store.configured_path()).unwrap();

    store.set_location(LockLocation::ProjectRoot).unwrap();
    let at_root = project.root().join(LOCKFILE_NAME);
    assert_eq!(fs::read(&at_root).unwrap(), original);
    assert!(!ctx.rules_dir.join(LOCKFILE_NAME).exists());

    store.set_location(LockLocation::RulesDir).unwrap();
    assert_eq!(
        fs::read(ctx.rules_dir.join(LOCKFILE_NAME)).unwrap(),
        original
    );
    assert!(!at_root.exists());
}

#[tokio::test]
async fn legacy_lockfiles_lift_and_rewrite_on_save() {
    let project = TestProject::new();
    project.write_file(
        &format!(".cursor/rules/{LOCKFILE_NAME}"),
        br#"{"installed": ["alice/old-style", "bob/another"]}"#,
    );

    let ctx = context(&project, Arc::new(MockForgeClient::new()));
    let store = ctx.store();
    let mut lockfile = store.load().unwrap();

    assert_eq!(lockfile.rules.len(), 2);
    assert_eq!(lockfile.rules[0].key, "alice/old-style");
    assert_eq!(lockfile.rules[0].source_type, SourceType::BuiltIn);
    assert_eq!(lockfile.rules[0].reference, "alice/old-style");

    store.save(&mut lockfile).unwrap();
    let raw = fs::read_to_string(store.configured_path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["rules"].as_array().unwrap().len(), 2);
    assert_eq!(
        json["installed"],
        serde_json::json!(["alice/old-style", "bob/another"])
    );
}

#[tokio::test]
async fn loads_from_root_location_when_rules_dir_is_empty() {
    let project = TestProject::new();
    project.write_file(
        LOCKFILE_NAME,
        br#"{"installed": ["alice/root-side"], "rules": []}"#,
    );

    let ctx = context(&project, Arc::new(MockForgeClient::new()));
    let lockfile = ctx.store().load().unwrap();
    assert_eq!(lockfile.rules.len(), 1);
    assert_eq!(lockfile.rules[0].key, "alice/root-side");
}
