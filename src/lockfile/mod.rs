//! Lockfile management: the persistent record of installed rules.
//!
//! The lockfile (`cursor-rules.lock`) is a JSON document holding one
//! [`RuleRecord`] per installed rule plus a legacy flat key list kept for
//! older readers:
//!
//! ```json
//! {
//!   "installed": ["alice/foo", "local/rel/rules-bar"],
//!   "rules": [
//!     {
//!       "key": "alice/foo",
//!       "sourceType": "github-shorthand",
//!       "reference": "alice/foo",
//!       "gitRef": "branch=main",
//!       "localFiles": ["alice/foo.mdc"],
//!       "resolvedCommit": "<40-hex>",
//!       "contentSHA256": "<64-hex>"
//!     }
//!   ]
//! }
//! ```
//!
//! # Locations
//!
//! The file lives at exactly one of two places: inside the rules directory
//! (default) or at the project root, which is the grandparent of the rules
//! directory (`.cursor/rules` -> project). The choice is an explicit flag
//! on the [`LockfileStore`], never module-level state. Loading checks the
//! configured location first and falls back to the other one, so a project
//! that moved its lockfile keeps working without ceremony; an explicit
//! [`LockfileStore::set_location`] performs the physical move and refuses
//! to act while both locations are occupied.
//!
//! # Invariants
//!
//! - Rule keys are unique.
//! - `installed` mirrors the keys of `rules`, in order, on every save.
//! - After [`LockfileStore::sync_with_disk`], every `.mdc` under the rules
//!   directory has a record and every record's files exist.
//!
//! # Legacy migration
//!
//! Early versions wrote only the flat `installed` list. When a lockfile
//! parses to an empty `rules` array but a nonempty `installed` list, each
//! legacy key is lifted into a minimal record (built-in source, reference
//! equal to the key, one `<key>.mdc` artifact) preserving order.

pub mod checksum;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::constants::{LOCKFILE_NAME, RULE_EXTENSION};
use crate::core::RulesError;
use crate::models::RuleRecord;
use crate::utils::fs::atomic_write;

/// The two candidate lockfile locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockLocation {
    /// `<rules_dir>/cursor-rules.lock` (default).
    RulesDir,
    /// `<project_root>/cursor-rules.lock`.
    ProjectRoot,
}

/// In-memory lockfile contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockFile {
    /// Legacy flat key list, mirrored from `rules` on every save.
    #[serde(default, rename = "installed")]
    pub legacy_installed: Vec<String>,

    /// Authoritative installed-rule records.
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

impl LockFile {
    /// An empty lockfile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RuleRecord> {
        self.rules.iter().find(|r| r.key == key)
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut RuleRecord> {
        self.rules.iter_mut().find(|r| r.key == key)
    }

    /// Whether a key is installed.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append a record. Callers must have checked for key collisions; the
    /// update policy for collisions lives in the resolver.
    pub fn push(&mut self, record: RuleRecord) {
        self.rules.push(record);
    }

    /// Remove and return the record for a key.
    pub fn remove(&mut self, key: &str) -> Option<RuleRecord> {
        let index = self.rules.iter().position(|r| r.key == key)?;
        Some(self.rules.remove(index))
    }

    /// Installed keys, in lockfile order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.key.clone()).collect()
    }

    /// Rewrite the legacy list to mirror `rules`.
    pub fn mirror_legacy(&mut self) {
        self.legacy_installed = self.keys();
    }

    fn lift_legacy(&mut self) {
        if self.rules.is_empty() && !self.legacy_installed.is_empty() {
            debug!(
                count = self.legacy_installed.len(),
                "lifting legacy lockfile keys into rule records"
            );
            self.rules = self
                .legacy_installed
                .iter()
                .map(|key| RuleRecord::minimal(key))
                .collect();
        }
    }
}

/// Loads, saves, relocates, and synchronizes the lockfile for one project.
#[derive(Debug, Clone)]
pub struct LockfileStore {
    rules_dir: PathBuf,
    project_root: PathBuf,
    location: LockLocation,
}

impl LockfileStore {
    /// Create a store for a rules directory.
    ///
    /// The project root is the grandparent of the rules directory
    /// (`<project>/.cursor/rules`); when the rules directory is too shallow
    /// to have one, the rules directory itself is used.
    #[must_use]
    pub fn new(rules_dir: &Path, location: LockLocation) -> Self {
        let project_root = rules_dir
            .parent()
            .and_then(Path::parent)
            .unwrap_or(rules_dir)
            .to_path_buf();
        Self {
            rules_dir: rules_dir.to_path_buf(),
            project_root,
            location,
        }
    }

    /// The currently configured lockfile location.
    #[must_use]
    pub fn location(&self) -> LockLocation {
        self.location
    }

    /// Path of the lockfile at the configured location.
    #[must_use]
    pub fn configured_path(&self) -> PathBuf {
        self.path_at(self.location)
    }

    fn other_location(&self) -> LockLocation {
        match self.location {
            LockLocation::RulesDir => LockLocation::ProjectRoot,
            LockLocation::ProjectRoot => LockLocation::RulesDir,
        }
    }

    fn path_at(&self, location: LockLocation) -> PathBuf {
        match location {
            LockLocation::RulesDir => self.rules_dir.join(LOCKFILE_NAME),
            LockLocation::ProjectRoot => self.project_root.join(LOCKFILE_NAME),
        }
    }

    /// Load the lockfile.
    ///
    /// Checks the configured location first and falls back to the other
    /// one (implicit migration on read). Returns an empty lockfile when
    /// neither exists. Legacy `installed`-only files are lifted into full
    /// records.
    pub fn load(&self) -> Result<LockFile> {
        let configured = self.configured_path();
        let path = if configured.exists() {
            configured
        } else {
            let other = self.path_at(self.other_location());
            if other.exists() {
                debug!(path = %other.display(), "using lockfile from alternate location");
                other
            } else {
                return Ok(LockFile::new());
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read lockfile: {}", path.display()))?;
        let mut lockfile: LockFile = serde_json::from_str(&content)
            .with_context(|| format!("Invalid lockfile syntax in {}", path.display()))?;
        lockfile.lift_legacy();
        Ok(lockfile)
    }

    /// Save the lockfile at the configured location, mirroring the legacy
    /// key list and writing atomically with two-space indentation.
    pub fn save(&self, lockfile: &mut LockFile) -> Result<()> {
        lockfile.mirror_legacy();
        let path = self.configured_path();
        let json = serde_json::to_string_pretty(lockfile)
            .context("Failed to serialize lockfile")?;
        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write lockfile: {}", path.display()))?;
        Ok(())
    }

    /// Move the lockfile to a new location.
    ///
    /// Refuses with [`RulesError::ConflictingLockfiles`] when both
    /// candidate files exist. When only the old location is occupied the
    /// bytes are copied and the old file deleted; when neither exists an
    /// empty lockfile is created at the new location. The configured
    /// location flips only after the file operation succeeds.
    pub fn set_location(&mut self, new_location: LockLocation) -> Result<()> {
        if new_location == self.location {
            return Ok(());
        }

        let old_path = self.configured_path();
        let new_path = self.path_at(new_location);

        if old_path.exists() && new_path.exists() {
            return Err(RulesError::ConflictingLockfiles.into());
        }

        if old_path.exists() {
            let bytes = fs::read(&old_path)
                .with_context(|| format!("Failed to read lockfile: {}", old_path.display()))?;
            atomic_write(&new_path, &bytes)
                .with_context(|| format!("Failed to write lockfile: {}", new_path.display()))?;
            fs::remove_file(&old_path).with_context(|| {
                format!("Failed to remove old lockfile: {}", old_path.display())
            })?;
        } else if !new_path.exists() {
            let mut empty = LockFile::new();
            let json = serde_json::to_string_pretty(&mut empty)
                .context("Failed to serialize lockfile")?;
            atomic_write(&new_path, json.as_bytes())
                .with_context(|| format!("Failed to write lockfile: {}", new_path.display()))?;
        }

        self.location = new_location;
        Ok(())
    }

    /// Resolve a `local_files` entry against the rules directory.
    #[must_use]
    pub fn resolve_artifact(&self, entry: &str) -> PathBuf {
        let path = Path::new(entry);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.rules_dir.join(path)
        }
    }

    /// Reconcile the lockfile with the files actually on disk.
    ///
    /// Walks the rules directory for `.mdc` files, adopting untracked ones
    /// as minimal records (key = relative path minus extension) and
    /// dropping artifact entries, then records, whose files are gone.
    /// Returns whether anything changed; callers decide whether to save.
    pub fn sync_with_disk(&self, lockfile: &mut LockFile) -> Result<bool> {
        let mut changed = false;

        // Drop vanished artifacts first so adoption below sees final state.
        lockfile.rules.retain_mut(|record| {
            let before = record.local_files.len();
            record
                .local_files
                .retain(|entry| self.resolve_artifact(entry).exists());
            if record.local_files.len() != before {
                changed = true;
            }
            if record.local_files.is_empty() {
                debug!(key = %record.key, "dropping record with no remaining files");
                changed = true;
                false
            } else {
                true
            }
        });

        if !self.rules_dir.exists() {
            return Ok(changed);
        }

        let tracked: BTreeSet<PathBuf> = lockfile
            .rules
            .iter()
            .flat_map(|r| r.local_files.iter())
            .map(|entry| self.resolve_artifact(entry))
            .collect();

        for entry in WalkDir::new(&self.rules_dir).follow_links(false) {
            let entry = entry.with_context(|| {
                format!("Failed to walk rules directory: {}", self.rules_dir.display())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RULE_EXTENSION) {
                continue;
            }
            if tracked.contains(path) {
                continue;
            }

            let relative = path.strip_prefix(&self.rules_dir).unwrap_or(path);
            let key = crate::utils::normalize_path_for_storage(relative)
                .trim_end_matches(&format!(".{RULE_EXTENSION}"))
                .to_string();
            if lockfile.contains(&key) {
                continue;
            }
            debug!(key = %key, "adopting untracked rule file");
            let mut record = RuleRecord::minimal(&key);
            record.content_sha256 = checksum::checksum_file(path).ok();
            lockfile.push(record);
            changed = true;
        }

        Ok(changed)
    }
}
