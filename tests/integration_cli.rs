//! Black-box CLI tests over local-only operations (no network).

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("cursor-rules").expect("binary builds");
    cmd.current_dir(project)
        .env("CURSOR_RULES_CONFIG", project.join("no-config.toml"))
        .env("NO_COLOR", "1")
        .arg("--project-dir")
        .arg(project);
    cmd
}

fn write(project: &Path, relative: &str, content: &str) {
    let path = project.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn add_list_remove_roundtrip() {
    let project = TempDir::new().unwrap();
    write(project.path(), "rules/style.mdc", "# style\n");

    cli(project.path())
        .args(["add", "./rules/style.mdc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("installed"));

    cli(project.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("local/rel/rules-style"));

    cli(project.path())
        .args(["remove", "local/rel/rules-style"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    cli(project.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No rules installed"));
}

#[test]
fn glob_add_reports_counts() {
    let project = TempDir::new().unwrap();
    write(project.path(), "rules/a.mdc", "# a\n");
    write(project.path(), "rules/b.mdc", "# b\n");
    write(project.path(), "rules/readme.txt", "not a rule\n");

    cli(project.path())
        .args(["add", "./rules/*.mdc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 installed"));
}

#[test]
fn unknown_remove_suggests_closest_key() {
    let project = TempDir::new().unwrap();
    write(project.path(), "rules/style.mdc", "# style\n");
    cli(project.path())
        .args(["add", "./rules/style.mdc"])
        .assert()
        .success();

    cli(project.path())
        .args(["remove", "local/rel/rules-styl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("did you mean"));
}

#[test]
fn share_and_restore_with_embedding() {
    let project_a = TempDir::new().unwrap();
    write(project_a.path(), "rules/own.mdc", "# mine\n");
    cli(project_a.path())
        .args(["add", "./rules/own.mdc"])
        .assert()
        .success();

    cli(project_a.path())
        .args(["share", "--embed", "-o", "manifest.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("with embedded content"));

    let project_b = TempDir::new().unwrap();
    let manifest = project_a.path().join("manifest.json");
    cli(project_b.path())
        .args(["restore", manifest.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 installed"));

    assert!(
        project_b
            .path()
            .join(".cursor/rules/local/rel/rules-own.mdc")
            .exists()
    );
}

#[test]
fn lock_location_moves_the_lockfile() {
    let project = TempDir::new().unwrap();
    write(project.path(), "rules/style.mdc", "# style\n");
    cli(project.path())
        .args(["add", "./rules/style.mdc"])
        .assert()
        .success();

    cli(project.path())
        .args(["lock-location", "root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("moved"));

    assert!(project.path().join("cursor-rules.lock").exists());
    assert!(!project.path().join(".cursor/rules/cursor-rules.lock").exists());

    // Subsequent commands keep using the root location.
    cli(project.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("local/rel/rules-style"));
}

#[test]
fn missing_local_reference_fails_with_diagnostic() {
    let project = TempDir::new().unwrap();
    cli(project.path())
        .args(["add", "./rules/absent.mdc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn templates_lists_the_builtin_catalog() {
    let project = TempDir::new().unwrap();
    cli(project.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("monorepo"))
        .stdout(predicate::str::contains("react"));
}

#[test]
fn config_set_and_show_round_trip() {
    let project = TempDir::new().unwrap();
    cli(project.path())
        .args(["config", "set-username", "alice"])
        .assert()
        .success();

    cli(project.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default_username = alice"));

    cli(project.path())
        .args(["config", "unset-username"])
        .assert()
        .success();

    cli(project.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not set"));
}

#[test]
fn outdated_is_clean_for_local_rules() {
    let project = TempDir::new().unwrap();
    write(project.path(), "rules/style.mdc", "# style\n");
    cli(project.path())
        .args(["add", "./rules/style.mdc"])
        .assert()
        .success();

    cli(project.path())
        .arg("outdated")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn builtin_template_installs_offline() {
    let project = TempDir::new().unwrap();
    cli(project.path())
        .args(["add", "monorepo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("built-in/monorepo"));

    assert!(
        project
            .path()
            .join(".cursor/rules/built-in/monorepo.mdc")
            .exists()
    );
}
