//! Restore: re-materialize rules from a share manifest.
//!
//! The manifest may come from a local path or an HTTP(S) URL. Restoration
//! is tolerant: each rule is processed independently, failures are
//! counted and reported, and the run continues. Key collisions resolve
//! per policy (skip, overwrite, rename to `<key>-N`), asking the
//! [`crate::prompt::Prompter`] when no policy was supplied.

use anyhow::{Context as _, Result};
use std::fs;
use tracing::{debug, warn};

use crate::config::Context;
use crate::constants::SHARE_FORMAT_VERSION;
use crate::core::RulesError;
use crate::models::{RuleRecord, ShareableLock, ShareableRule, SourceType};
use crate::prompt::ConflictChoice;
use crate::resolver::{HandlerOutcome, InstallOutcome, ResolvedRule, Resolver};

/// Counters for one restore run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Rules materialized into the project.
    pub installed: usize,
    /// Rules skipped (unshareable, conflict policy, or already present).
    pub skipped: usize,
    /// Rules that failed to materialize.
    pub failed: usize,
}

impl RestoreReport {
    /// Total rules processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.installed + self.skipped + self.failed
    }
}

/// Load a manifest from a local path or URL.
pub async fn load_manifest(source: &str) -> Result<ShareableLock> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .map_err(|e| RulesError::ForgeAccess {
                reference: source.to_string(),
                reason: e.to_string(),
            })?;
        let response = response.error_for_status().map_err(|e| RulesError::ForgeAccess {
            reference: source.to_string(),
            reason: e.to_string(),
        })?;
        response.text().await.map_err(|e| RulesError::ForgeAccess {
            reference: source.to_string(),
            reason: e.to_string(),
        })?
    } else {
        fs::read_to_string(source)
            .with_context(|| format!("Failed to read share manifest: {source}"))?
    };

    let manifest: ShareableLock =
        serde_json::from_str(&text).context("Invalid share manifest JSON")?;
    if manifest.format_version != SHARE_FORMAT_VERSION {
        return Err(RulesError::UnsupportedFormat {
            version: manifest.format_version,
        }
        .into());
    }
    Ok(manifest)
}

/// Smallest unused `<key>-N` (N >= 1) against the installed key set.
fn renamed_key(ctx: &Context, key: &str) -> Result<String> {
    let lockfile = ctx.store().load()?;
    let mut n = 1usize;
    loop {
        let candidate = format!("{key}-{n}");
        if !lockfile.contains(&candidate) {
            return Ok(candidate);
        }
        n += 1;
    }
}

/// Materialize one shared rule under a final key.
async fn materialize(
    ctx: &Context,
    resolver: &Resolver,
    rule: &ShareableRule,
    final_key: &str,
) -> Result<InstallOutcome> {
    if let Some(content) = &rule.content {
        // Embedded content installs directly, registered as built-in so
        // the record is self-contained on this machine.
        let record = RuleRecord {
            key: final_key.to_string(),
            source_type: SourceType::BuiltIn,
            reference: final_key.to_string(),
            category: None,
            git_ref: None,
            local_files: Vec::new(),
            resolved_commit: None,
            content_sha256: None,
            glob_pattern: None,
        };
        let resolved = ResolvedRule::single(record, content.clone().into_bytes());
        return resolver.commit_single(ctx, resolved);
    }

    if rule.source_type.is_forge() {
        let outcome = resolver.resolve(ctx, &rule.reference).await?;
        let HandlerOutcome::One(mut resolved) = outcome else {
            return Err(RulesError::ReferenceType {
                reference: rule.reference.clone(),
                reason: "shared rule re-resolved to a batch".to_string(),
            }
            .into());
        };
        if resolved.record.key != final_key {
            let content = resolved
                .files
                .first()
                .map(|(_, bytes)| bytes.clone())
                .unwrap_or_default();
            resolved.record.key = final_key.to_string();
            resolved = ResolvedRule::single(resolved.record, content);
        }
        return resolver.commit_single(ctx, resolved);
    }

    if rule.source_type == SourceType::BuiltIn {
        let Some(category) = &rule.category else {
            // Template category can be recovered by name.
            let name = rule.reference.clone();
            let Some((category, _)) = ctx.templates.find_by_name(&name) else {
                return Err(RulesError::ReferenceType {
                    reference: name,
                    reason: "built-in template not present in this registry".to_string(),
                }
                .into());
            };
            let mut resolved = resolver.resolve_builtin(ctx, &category, &name)?;
            if resolved.record.key != final_key {
                let content = resolved.files.remove(0).1;
                resolved.record.key = final_key.to_string();
                resolved = ResolvedRule::single(resolved.record, content);
            }
            return resolver.commit_single(ctx, resolved);
        };
        let mut resolved = resolver.resolve_builtin(ctx, category, &rule.reference)?;
        if resolved.record.key != final_key {
            let content = resolved.files.remove(0).1;
            resolved.record.key = final_key.to_string();
            resolved = ResolvedRule::single(resolved.record, content);
        }
        return resolver.commit_single(ctx, resolved);
    }

    Err(RulesError::ReferenceType {
        reference: rule.reference.clone(),
        reason: format!("unsupported shared source type: {}", rule.source_type),
    }
    .into())
}

/// Restore every rule in a manifest, resolving conflicts per `policy`.
pub async fn restore(
    ctx: &Context,
    resolver: &Resolver,
    source: &str,
    policy: Option<ConflictChoice>,
) -> Result<RestoreReport> {
    let manifest = load_manifest(source).await?;
    let mut report = RestoreReport::default();

    for rule in &manifest.rules {
        if rule.unshareable {
            println!("  skipping {} (not shareable)", rule.key);
            report.skipped += 1;
            continue;
        }

        // Reload per rule so earlier installs are visible to the check.
        let installed = ctx.store().load()?;
        let mut final_key = rule.key.clone();
        if installed.contains(&rule.key) {
            let choice = match policy {
                Some(choice) => choice,
                None => ctx.prompter.resolve_conflict(&rule.key)?,
            };
            match choice {
                ConflictChoice::Skip => {
                    debug!(key = %rule.key, "conflict resolved by skipping");
                    report.skipped += 1;
                    continue;
                }
                ConflictChoice::Overwrite => {
                    resolver.remove(ctx, &rule.key)?;
                }
                ConflictChoice::Rename => {
                    final_key = renamed_key(ctx, &rule.key)?;
                    debug!(key = %rule.key, renamed = %final_key, "conflict resolved by renaming");
                }
            }
        }

        match materialize(ctx, resolver, rule, &final_key).await {
            Ok(InstallOutcome::Installed(_)) => report.installed += 1,
            Ok(_) => report.skipped += 1,
            Err(error) => {
                warn!(key = %rule.key, error = %error, "failed to restore rule");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
