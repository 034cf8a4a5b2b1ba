//! Test utilities: a temp-project fixture, an in-memory forge, and a
//! scripted prompter.
//!
//! Available to unit tests and, via the `test-utils` feature, to the
//! integration test suite.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::Context;
use crate::constants::RULES_DIR_RELATIVE;
use crate::core::CancellationToken;
use crate::forge::{FetchError, ForgeClient, raw_url};
use crate::prompt::{ConflictChoice, Prompter};
use crate::templates::BuiltinTemplates;
use crate::utils::fs::ensure_dir;

/// A throwaway project directory with a rules dir and context builder.
pub struct TestProject {
    root: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create a temp project with an empty `.cursor/rules` directory.
    #[must_use]
    pub fn new() -> Self {
        let root = TempDir::new().expect("failed to create temp project");
        ensure_dir(&root.path().join(RULES_DIR_RELATIVE)).expect("failed to create rules dir");
        Self { root }
    }

    /// The project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// The rules directory.
    #[must_use]
    pub fn rules_dir(&self) -> PathBuf {
        self.root.path().join(RULES_DIR_RELATIVE)
    }

    /// Write a file under the project root, creating parents.
    pub fn write_file(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            ensure_dir(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, content).expect("failed to write fixture file");
        path
    }

    /// A context with an empty mock forge and an always-yes prompter.
    #[must_use]
    pub fn context(&self) -> Context {
        self.context_with(Arc::new(MockForgeClient::new()), Arc::new(ScriptedPrompter::always_yes()))
    }

    /// A context with explicit forge and prompter capabilities.
    #[must_use]
    pub fn context_with(
        &self,
        forge: Arc<dyn ForgeClient>,
        prompter: Arc<dyn Prompter>,
    ) -> Context {
        Context {
            rules_dir: self.rules_dir(),
            base_dir: self.root.path().to_path_buf(),
            use_root_lockfile: false,
            default_username: None,
            forge,
            templates: Arc::new(BuiltinTemplates::new()),
            prompter,
            cancel: CancellationToken::new(),
        }
    }
}

type FileKey = (String, String, String, String);
type HeadKey = (String, String, String);

/// In-memory [`ForgeClient`] backed by maps of files and branch heads.
#[derive(Debug, Default)]
pub struct MockForgeClient {
    files: Mutex<HashMap<FileKey, Vec<u8>>>,
    heads: Mutex<HashMap<HeadKey, String>>,
}

impl MockForgeClient {
    /// An empty forge; every fetch is a 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file at `(owner, repo, ref, path)`.
    #[must_use]
    pub fn with_file(
        self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: &str,
        content: &[u8],
    ) -> Self {
        self.files.lock().unwrap().insert(
            (
                owner.to_string(),
                repo.to_string(),
                git_ref.to_string(),
                path.to_string(),
            ),
            content.to_vec(),
        );
        self
    }

    /// Register a branch head commit.
    #[must_use]
    pub fn with_head(self, owner: &str, repo: &str, branch: &str, sha: &str) -> Self {
        self.heads.lock().unwrap().insert(
            (owner.to_string(), repo.to_string(), branch.to_string()),
            sha.to_string(),
        );
        self
    }

    /// Replace a registered file's content in place (post-construction).
    pub fn update_file(&self, owner: &str, repo: &str, git_ref: &str, path: &str, content: &[u8]) {
        self.files.lock().unwrap().insert(
            (
                owner.to_string(),
                repo.to_string(),
                git_ref.to_string(),
                path.to_string(),
            ),
            content.to_vec(),
        );
    }

    /// Replace a registered branch head (post-construction).
    pub fn update_head(&self, owner: &str, repo: &str, branch: &str, sha: &str) {
        self.heads.lock().unwrap().insert(
            (owner.to_string(), repo.to_string(), branch.to_string()),
            sha.to_string(),
        );
    }
}

impl ForgeClient for MockForgeClient {
    fn fetch_raw(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let key = (
            owner.to_string(),
            repo.to_string(),
            git_ref.to_string(),
            path.to_string(),
        );
        let url = raw_url(owner, repo, git_ref, path);
        let found = self.files.lock().unwrap().get(&key).cloned();
        let cancelled = cancel.is_cancelled();
        Box::pin(async move {
            if cancelled {
                return Err(FetchError::Cancelled);
            }
            found.ok_or(FetchError::NotFound { url })
        })
    }

    fn head_commit(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<String, FetchError>> {
        let key = (owner.to_string(), repo.to_string(), branch.to_string());
        let url = format!("mock://{owner}/{repo}/branches/{branch}");
        let found = self.heads.lock().unwrap().get(&key).cloned();
        let cancelled = cancel.is_cancelled();
        Box::pin(async move {
            if cancelled {
                return Err(FetchError::Cancelled);
            }
            found.ok_or(FetchError::NotFound { url })
        })
    }

    fn list_tree(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<String>, FetchError>> {
        let matcher = glob::Pattern::new(pattern);
        let files = self.files.lock().unwrap();
        let mut paths: Vec<String> = files
            .keys()
            .filter(|(o, r, g, _)| o == owner && r == repo && g == git_ref)
            .map(|(_, _, _, path)| path.clone())
            .collect();
        paths.sort();
        let cancelled = cancel.is_cancelled();
        Box::pin(async move {
            if cancelled {
                return Err(FetchError::Cancelled);
            }
            let matcher = matcher.map_err(|e| FetchError::Malformed {
                url: String::new(),
                message: format!("invalid glob pattern: {e}"),
            })?;
            Ok(paths.into_iter().filter(|p| matcher.matches(p)).collect())
        })
    }
}

/// Deterministic [`Prompter`] with preset answers and a call log.
#[derive(Debug)]
pub struct ScriptedPrompter {
    overwrite: bool,
    unpin: bool,
    conflict: ConflictChoice,
    calls: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Answers yes to everything; conflicts resolve to overwrite.
    #[must_use]
    pub fn always_yes() -> Self {
        Self {
            overwrite: true,
            unpin: true,
            conflict: ConflictChoice::Overwrite,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers no to everything; conflicts resolve to skip.
    #[must_use]
    pub fn always_no() -> Self {
        Self {
            overwrite: false,
            unpin: false,
            conflict: ConflictChoice::Skip,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Yes to confirmations, conflicts resolve to the given choice.
    #[must_use]
    pub fn returns(conflict: ConflictChoice) -> Self {
        Self {
            overwrite: true,
            unpin: true,
            conflict,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The questions asked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm_overwrite(&self, path: &str) -> anyhow::Result<bool> {
        self.calls.lock().unwrap().push(format!("overwrite:{path}"));
        Ok(self.overwrite)
    }

    fn confirm_unpin(&self, key: &str) -> anyhow::Result<bool> {
        self.calls.lock().unwrap().push(format!("unpin:{key}"));
        Ok(self.unpin)
    }

    fn resolve_conflict(&self, key: &str) -> anyhow::Result<ConflictChoice> {
        self.calls.lock().unwrap().push(format!("conflict:{key}"));
        Ok(self.conflict)
    }
}
