//! Shared fixtures for the integration suite.

#![allow(dead_code)]

use std::sync::Arc;

use cursor_rules_cli::config::Context;
use cursor_rules_cli::constants::COLLECTION_REPO;
use cursor_rules_cli::prompt::Prompter;
use cursor_rules_cli::test_utils::{MockForgeClient, ScriptedPrompter, TestProject};

/// A 40-hex commit used as the initial branch head.
pub const HEAD_A: &str = "0123456789abcdef0123456789abcdef01234567";

/// A 40-hex commit used as the advanced branch head.
pub const HEAD_B: &str = "fedcba9876543210fedcba9876543210fedcba98";

/// A mock forge with `alice/foo` on the collection repo default branch.
pub fn forge_with_alice_foo() -> MockForgeClient {
    MockForgeClient::new()
        .with_file("alice", COLLECTION_REPO, "main", "foo.mdc", b"# foo")
        .with_head("alice", COLLECTION_REPO, "main", HEAD_A)
}

/// A project context wired to the given forge and an always-yes prompter.
pub fn context(project: &TestProject, forge: Arc<MockForgeClient>) -> Context {
    project.context_with(forge, Arc::new(ScriptedPrompter::always_yes()))
}

/// A project context with an explicit prompter.
pub fn context_with_prompter(
    project: &TestProject,
    forge: Arc<MockForgeClient>,
    prompter: Arc<dyn Prompter>,
) -> Context {
    project.context_with(forge, prompter)
}
