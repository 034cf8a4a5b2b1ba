//! The upgrade engine: policy-driven replacement of installed rule
//! content based on where a rule came from.
//!
//! Policies by source type:
//!
//! - **Built-in** rules re-read the template registry and overwrite their
//!   artifacts unconditionally.
//! - **Branch-tracked forge** rules chase the branch head: if the head
//!   commit equals the recorded `resolved_commit` the upgrade is a no-op;
//!   otherwise local edits are detected by comparing on-disk checksums
//!   with the recorded `content_sha256`, the user is asked before any
//!   locally modified file is overwritten, and a refusal aborts the whole
//!   upgrade run.
//! - **Pinned forge** rules (commit or tag) first ask the user to unpin;
//!   on acceptance the ref is rewritten to track the default branch and
//!   the branch policy applies. Refusal is a skip, not an error.
//! - **Local** rules are a no-op with a diagnostic; re-add the file to
//!   refresh them.
//!
//! Each rule upgrades atomically: any I/O failure leaves the lockfile
//! untouched for that rule.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::Context;
use crate::constants::DEFAULT_BRANCH;
use crate::core::RulesError;
use crate::forge::FetchError;
use crate::installer;
use crate::lockfile::checksum::checksum_file;
use crate::models::{GitRef, RuleRecord, SourceType};
use crate::reference::{parse_blob_url, parse_shorthand, parse_shorthand_commit, parse_shorthand_path, parse_shorthand_tag};
use crate::resolver::handlers::forge_error;

/// Outcome of upgrading one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Content was refreshed; carries the new pinned commit when the
    /// source tracks a branch.
    Upgraded {
        /// The upgraded key
        key: String,
        /// New branch head, for branch-tracked sources
        new_commit: Option<String>,
    },
    /// The source has not moved; nothing was changed.
    UpToDate {
        /// The checked key
        key: String,
    },
    /// Local sources are not upgraded in place.
    SkippedLocal {
        /// The skipped key
        key: String,
    },
    /// The user declined a prompt; the rule (and for overwrite refusals,
    /// the whole run) is left untouched.
    Cancelled {
        /// The key whose prompt was declined
        key: String,
    },
}

/// Report for an upgrade run over several keys.
#[derive(Debug, Default)]
pub struct UpgradeReport {
    /// Per-key outcomes in processing order.
    pub outcomes: Vec<(String, UpgradeOutcome)>,
    /// Keys that failed, with error renderings.
    pub failures: Vec<(String, String)>,
    /// Whether the run was aborted by an overwrite refusal.
    pub aborted: bool,
}

/// One rule with newer content available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedRule {
    /// The installed key.
    pub key: String,
    /// Currently recorded commit, when the source pins one.
    pub current: Option<String>,
    /// Latest branch head, when the source tracks a branch.
    pub latest: Option<String>,
}

/// Result of an outdated check over the whole lockfile.
#[derive(Debug, Default)]
pub struct OutdatedReport {
    /// Rules with newer content available.
    pub outdated: Vec<OutdatedRule>,
    /// Rules whose check failed (network etc.).
    pub failed: usize,
}

/// Applies the per-source-type upgrade policies.
#[derive(Default)]
pub struct UpgradeEngine;

impl UpgradeEngine {
    /// New engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Upgrade a single rule by key.
    pub async fn upgrade(&self, ctx: &Context, key: &str) -> Result<UpgradeOutcome> {
        let store = ctx.store();
        let mut lockfile = store.load()?;
        let Some(record) = lockfile.get(key).cloned() else {
            return Err(RulesError::RuleNotFound {
                key: key.to_string(),
            }
            .into());
        };

        let outcome = match record.source_type {
            SourceType::BuiltIn => self.upgrade_builtin(ctx, &record)?,
            SourceType::LocalAbsolute | SourceType::LocalRelative => {
                info!(key, "local rule; re-add the source file to refresh it");
                UpgradeOutcome::SkippedLocal {
                    key: key.to_string(),
                }
            }
            _ => self.upgrade_forge(ctx, record.clone()).await?,
        };

        if let UpgradeOutcome::Upgraded { .. } = &outcome {
            // The record was refreshed by the policy; persist it.
            if let Some(slot) = lockfile.get_mut(key) {
                *slot = self.refreshed_record(ctx, &record, &outcome)?;
            }
            store.save(&mut lockfile)?;
        }
        Ok(outcome)
    }

    /// Upgrade every installed rule (or the given keys), stopping the run
    /// if the user refuses an overwrite.
    pub async fn upgrade_all(&self, ctx: &Context, keys: Option<&[String]>) -> Result<UpgradeReport> {
        let store = ctx.store();
        let lockfile = store.load()?;
        let targets: Vec<String> = match keys {
            Some(keys) => keys.to_vec(),
            None => lockfile.keys(),
        };

        let mut report = UpgradeReport::default();
        for key in targets {
            match self.upgrade(ctx, &key).await {
                Ok(outcome) => {
                    let cancelled = matches!(outcome, UpgradeOutcome::Cancelled { .. });
                    report.outcomes.push((key.clone(), outcome));
                    if cancelled {
                        report.aborted = true;
                        break;
                    }
                }
                Err(error) => {
                    warn!(key, error = %error, "upgrade failed");
                    report.failures.push((key, format!("{error:#}")));
                }
            }
        }
        Ok(report)
    }

    /// Check which rules have newer content available, without changing
    /// anything. Branch-tracked forge rules compare the branch head with
    /// the recorded commit; built-in rules compare registry content with
    /// the recorded checksum. Per-rule check failures are reported, not
    /// fatal.
    pub async fn check_outdated(&self, ctx: &Context) -> Result<OutdatedReport> {
        let lockfile = ctx.store().load()?;
        let mut report = OutdatedReport::default();

        for record in &lockfile.rules {
            match record.source_type {
                SourceType::BuiltIn => {
                    let name = record.reference.as_str();
                    let content = match &record.category {
                        Some(category) => ctx.templates.get(category, name),
                        None => ctx.templates.find_by_name(name).map(|(_, c)| c),
                    };
                    if let Some(content) = content {
                        let current = crate::lockfile::checksum::checksum_bytes(content.as_bytes());
                        if record.content_sha256.as_deref() != Some(current.as_str()) {
                            report.outdated.push(OutdatedRule {
                                key: record.key.clone(),
                                current: record.resolved_commit.clone(),
                                latest: None,
                            });
                        }
                    }
                }
                _ if record.git_ref.as_ref().is_some_and(|r| r.branch().is_some()) => {
                    let branch = record
                        .git_ref
                        .as_ref()
                        .and_then(|r| r.branch())
                        .unwrap_or(DEFAULT_BRANCH)
                        .to_string();
                    let (owner, repo) = forge_repo(record)?;
                    match ctx
                        .forge
                        .head_commit(&owner, &repo, &branch, &ctx.cancel)
                        .await
                    {
                        Ok(head) => {
                            if record.resolved_commit.as_deref() != Some(head.as_str()) {
                                report.outdated.push(OutdatedRule {
                                    key: record.key.clone(),
                                    current: record.resolved_commit.clone(),
                                    latest: Some(head),
                                });
                            }
                        }
                        Err(error) => {
                            warn!(key = %record.key, error = %error, "outdated check failed");
                            report.failed += 1;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(report)
    }

    fn upgrade_builtin(&self, ctx: &Context, record: &RuleRecord) -> Result<UpgradeOutcome> {
        let name = record.reference.as_str();
        let content = match &record.category {
            Some(category) => ctx.templates.get(category, name),
            None => ctx.templates.find_by_name(name).map(|(_, content)| content),
        }
        .ok_or_else(|| RulesError::ReferenceType {
            reference: name.to_string(),
            reason: "built-in template no longer exists".to_string(),
        })?;

        for entry in &record.local_files {
            installer::write_artifact(ctx, entry, content.as_bytes())?;
        }
        Ok(UpgradeOutcome::Upgraded {
            key: record.key.clone(),
            new_commit: None,
        })
    }

    async fn upgrade_forge(&self, ctx: &Context, mut record: RuleRecord) -> Result<UpgradeOutcome> {
        // Pinned rules need an explicit unpin before they can move.
        if matches!(record.git_ref, Some(GitRef::Commit(_)) | Some(GitRef::Tag(_))) {
            if !ctx.prompter.confirm_unpin(&record.key)? {
                info!(key = %record.key, "keeping pin; upgrade skipped");
                return Ok(UpgradeOutcome::Cancelled {
                    key: record.key,
                });
            }
            record.git_ref = Some(GitRef::Branch(DEFAULT_BRANCH.to_string()));
        }

        let Some(branch) = record.git_ref.as_ref().and_then(|r| r.branch()).map(String::from)
        else {
            return Err(RulesError::ReferenceType {
                reference: record.reference.clone(),
                reason: "forge rule has no branch to track".to_string(),
            }
            .into());
        };

        let (owner, repo) = forge_repo(&record)?;
        ctx.cancel.check()?;
        let head = ctx
            .forge
            .head_commit(&owner, &repo, &branch, &ctx.cancel)
            .await
            .map_err(|e| forge_error(&record.reference, e))?;

        if record.resolved_commit.as_deref() == Some(head.as_str()) {
            debug!(key = %record.key, head, "branch head unchanged");
            return Ok(UpgradeOutcome::UpToDate {
                key: record.key,
            });
        }

        // Detect local edits before touching anything.
        if let Some(stored) = &record.content_sha256 {
            for entry in &record.local_files {
                let path = ctx.artifact_path(entry);
                if !path.exists() {
                    continue;
                }
                let on_disk = checksum_file(&path)?;
                if on_disk != *stored && !ctx.prompter.confirm_overwrite(entry)? {
                    info!(key = %record.key, "overwrite declined; upgrade cancelled");
                    return Ok(UpgradeOutcome::Cancelled {
                        key: record.key,
                    });
                }
            }
        }

        let content = fetch_current(ctx, &record, &owner, &repo, &branch).await?;
        for entry in &record.local_files {
            installer::write_artifact(ctx, entry, &content)?;
        }
        Ok(UpgradeOutcome::Upgraded {
            key: record.key,
            new_commit: Some(head),
        })
    }

    /// Rebuild the lockfile record after a successful upgrade.
    fn refreshed_record(
        &self,
        ctx: &Context,
        original: &RuleRecord,
        outcome: &UpgradeOutcome,
    ) -> Result<RuleRecord> {
        let mut record = original.clone();
        if let UpgradeOutcome::Upgraded { new_commit, .. } = outcome {
            if new_commit.is_some() {
                record.resolved_commit = new_commit.clone();
                // A pinned rule that upgraded was unpinned along the way.
                if matches!(record.git_ref, Some(GitRef::Commit(_)) | Some(GitRef::Tag(_))) {
                    record.git_ref = Some(GitRef::Branch(DEFAULT_BRANCH.to_string()));
                }
            }
        }
        let paths: Vec<std::path::PathBuf> = record
            .local_files
            .iter()
            .map(|entry| ctx.artifact_path(entry))
            .collect();
        let borrowed: Vec<&std::path::Path> = paths.iter().map(AsRef::as_ref).collect();
        record.content_sha256 = Some(crate::lockfile::checksum::checksum_files(&borrowed)?);
        Ok(record)
    }
}

/// The `(owner, repo)` a forge-sourced record fetches from.
fn forge_repo(record: &RuleRecord) -> Result<(String, String)> {
    use crate::constants::COLLECTION_REPO;

    let key_segments: Vec<&str> = record.key.split('/').collect();
    match record.source_type {
        SourceType::ForgeFile | SourceType::ForgeDirectory => {
            let blob = parse_blob_url(&record.reference).ok_or_else(|| {
                RulesError::ReferenceType {
                    reference: record.reference.clone(),
                    reason: "record no longer parses as a forge URL".to_string(),
                }
            })?;
            Ok((blob.owner, blob.repo))
        }
        SourceType::ForgeRepoPath => {
            if key_segments.len() < 2 {
                return Err(RulesError::ReferenceType {
                    reference: record.reference.clone(),
                    reason: "repo-path key is missing its repository segment".to_string(),
                }
                .into());
            }
            Ok((key_segments[0].to_string(), key_segments[1].to_string()))
        }
        _ => Ok((key_segments[0].to_string(), COLLECTION_REPO.to_string())),
    }
}

/// Candidate in-repo paths for a record's file, most likely first.
fn candidate_paths(record: &RuleRecord) -> Vec<String> {
    match record.source_type {
        SourceType::ForgeFile | SourceType::ForgeDirectory => parse_blob_url(&record.reference)
            .map(|blob| vec![blob.path])
            .unwrap_or_default(),
        SourceType::ForgeRepoPath => parse_shorthand_path(&record.reference)
            .map(|(_, segments, _)| vec![format!("{}.mdc", segments[1..].join("/"))])
            .unwrap_or_default(),
        SourceType::ForgeGlob => {
            // Glob keys mirror the in-repo path directly.
            record
                .key
                .split_once('/')
                .map(|(_, path)| vec![format!("{path}.mdc")])
                .unwrap_or_default()
        }
        SourceType::ForgeShorthand => {
            let reference = record.reference.as_str();
            if let Some((_, rule)) = parse_shorthand(reference) {
                return vec![format!("{rule}.mdc")];
            }
            if let Some((_, rule, _)) = parse_shorthand_commit(reference) {
                return vec![format!("{rule}.mdc")];
            }
            if let Some((_, rule, _)) = parse_shorthand_tag(reference) {
                return vec![format!("{rule}.mdc")];
            }
            if let Some((_, segments, _)) = parse_shorthand_path(reference) {
                let joined = segments.join("/");
                let last = segments.last().cloned().unwrap_or_default();
                return vec![format!("{joined}.mdc"), format!("{joined}/{last}.mdc")];
            }
            // Bare word installed under the default username; the key
            // carries the owner, the reference carries the rule name.
            vec![format!("{reference}.mdc")]
        }
        _ => Vec::new(),
    }
}

/// Fetch the current authoritative content for a forge record.
async fn fetch_current(
    ctx: &Context,
    record: &RuleRecord,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Result<Vec<u8>> {
    let candidates = candidate_paths(record);
    if candidates.is_empty() {
        return Err(RulesError::ReferenceType {
            reference: record.reference.clone(),
            reason: "cannot derive a fetch path for this record".to_string(),
        }
        .into());
    }

    let mut tried = Vec::with_capacity(candidates.len());
    for path in candidates {
        match ctx
            .forge
            .fetch_raw(owner, repo, branch, &path, &ctx.cancel)
            .await
        {
            Ok(content) => return Ok(content),
            Err(FetchError::NotFound { url }) => tried.push(url),
            Err(other) => return Err(forge_error(&record.reference, other)),
        }
    }
    Err(RulesError::ForgeAccess {
        reference: record.reference.clone(),
        reason: format!("not found; tried {}", tried.join(", ")),
    }
    .into())
}

#[cfg(test)]
mod tests;
