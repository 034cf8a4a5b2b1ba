//! Artifact installation: writing rule files under the rules directory
//! and removing them again.
//!
//! Keys are hierarchical, so writes create intermediate directories on
//! demand (0755) and removals prune directories that end up empty. File
//! bytes are preserved exactly; frontmatter is never parsed or rewritten.

use anyhow::{Context as _, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Context;
use crate::constants::RULE_EXTENSION;
use crate::models::RuleRecord;
use crate::utils::fs::atomic_write;

/// The artifact file name for a rule key (`<key>.mdc`).
#[must_use]
pub fn artifact_name(key: &str) -> String {
    format!("{key}.{RULE_EXTENSION}")
}

/// Write one artifact under the rules directory, creating parents.
///
/// Checks cancellation immediately before the write so a cancelled
/// operation never leaves a partial install.
pub fn write_artifact(ctx: &Context, entry: &str, content: &[u8]) -> Result<PathBuf> {
    ctx.cancel.check()?;
    let path = ctx.artifact_path(entry);
    atomic_write(&path, content)
        .with_context(|| format!("Failed to install rule file: {}", path.display()))?;
    debug!(path = %path.display(), bytes = content.len(), "wrote rule artifact");
    Ok(path)
}

/// Unlink every artifact of a record and prune empty parent directories.
pub fn remove_artifacts(ctx: &Context, record: &RuleRecord) -> Result<()> {
    for entry in &record.local_files {
        let path = ctx.artifact_path(entry);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove rule file: {}", path.display()))?;
            debug!(path = %path.display(), "removed rule artifact");
        }
        prune_empty_dirs(path.parent(), &ctx.rules_dir);
    }
    Ok(())
}

/// Remove now-empty directories between an artifact and the rules
/// directory root. Best-effort; failures are ignored.
fn prune_empty_dirs(start: Option<&Path>, rules_dir: &Path) {
    let mut current = start;
    while let Some(dir) = current {
        if dir == rules_dir || !dir.starts_with(rules_dir) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}
