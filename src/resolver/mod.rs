//! Reference resolution and installation.
//!
//! The resolver owns an ordered registry of [`ReferenceHandler`]s, one per
//! reference form, registered in exactly the classification order of
//! [`crate::reference`]. Installing a reference means: find the first
//! handler that claims it, let the handler fetch the authoritative bytes
//! and describe the resulting record, then commit artifact writes and the
//! lockfile update here. Handlers never touch the lockfile; the
//! never-silently-overwrite policy lives in one place.
//!
//! # Update policy
//!
//! On a successful single-rule resolution:
//! 1. Reload the lockfile.
//! 2. If the key is already present, compare `resolved_commit` (when both
//!    sides have one) and `content_sha256`. A difference produces a
//!    [`InstallOutcome::Drifted`] notice suggesting an upgrade, with no
//!    mutation. A match returns [`InstallOutcome::AlreadyInstalled`]
//!    silently.
//! 3. Otherwise write the artifacts, append the record, mirror the legacy
//!    key list, and save.
//!
//! Glob resolutions commit as one batch: matches install in lexicographic
//! order, duplicate keys within the batch keep the first occurrence, keys
//! already installed are skipped, and the lockfile is saved exactly once.
//!
//! # The template redirect
//!
//! The fallback handler signals "this bare word is a built-in template"
//! with the typed [`RulesError::TemplateFound`] variant. The resolver
//! intercepts that variant (never message text), pulls the content from
//! the registry, and installs it like any other rule.

pub mod handlers;

use anyhow::Result;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::config::Context;
use crate::core::RulesError;
use crate::installer;
use crate::lockfile::checksum::checksum_bytes;
use crate::models::{RuleRecord, SourceType};

/// A rule fully resolved by a handler: the record to persist plus the
/// authoritative bytes for each artifact, not yet written.
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    /// The record that will enter the lockfile.
    pub record: RuleRecord,
    /// `(artifact path, content)` pairs matching `record.local_files`.
    pub files: Vec<(String, Vec<u8>)>,
}

impl ResolvedRule {
    /// Build a single-artifact rule; fills `local_files` and
    /// `content_sha256` from the content.
    #[must_use]
    pub fn single(mut record: RuleRecord, content: Vec<u8>) -> Self {
        let artifact = installer::artifact_name(&record.key);
        record.local_files = vec![artifact.clone()];
        record.content_sha256 = Some(checksum_bytes(&content));
        Self {
            record,
            files: vec![(artifact, content)],
        }
    }
}

/// What a handler produced.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// One rule.
    One(ResolvedRule),
    /// A glob expansion: zero or more rules plus a count of matches that
    /// failed to resolve (already logged by the handler).
    Batch {
        /// Successfully resolved rules, in lexicographic match order.
        rules: Vec<ResolvedRule>,
        /// Matches that failed to resolve.
        errored: usize,
    },
}

/// Result of one install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A new rule was installed.
    Installed(RuleRecord),
    /// The key was already installed with matching content.
    AlreadyInstalled {
        /// The existing key
        key: String,
    },
    /// The key is installed but upstream content differs; nothing was
    /// changed and the user should run an upgrade.
    Drifted {
        /// The existing key
        key: String,
    },
    /// A glob reference completed as a batch.
    GlobCompleted {
        /// Newly installed rules
        added: usize,
        /// Matches skipped because their key was already installed
        skipped: usize,
        /// Matches that failed to resolve
        errored: usize,
    },
}

/// One reference form: a claim check and a fetch.
pub trait ReferenceHandler: Send + Sync {
    /// Stable name for logs.
    fn name(&self) -> &'static str;

    /// Whether this handler recognizes the reference. Handlers are asked
    /// in registration order; the first claim wins.
    fn can_handle(&self, ctx: &Context, reference: &str) -> bool;

    /// Resolve the reference to records and content. Must not write the
    /// rules directory or the lockfile.
    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>>;
}

/// Report for a multi-reference install request.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Per-reference outcomes, in request order.
    pub outcomes: Vec<(String, InstallOutcome)>,
    /// References that failed, with their error renderings.
    pub failures: Vec<(String, String)>,
}

impl BatchReport {
    /// Count of newly installed rules across outcomes.
    #[must_use]
    pub fn installed(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                InstallOutcome::Installed(_) => 1,
                InstallOutcome::GlobCompleted { added, .. } => *added,
                _ => 0,
            })
            .sum()
    }
}

/// The strategy registry and install orchestrator.
pub struct Resolver {
    handlers: Vec<Box<dyn ReferenceHandler>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Build the registry in classification order. New reference forms
    /// are added by registering a handler, not by branching here.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: vec![
                Box::new(handlers::glob::LocalGlobHandler),
                Box::new(handlers::glob::ForgeGlobHandler),
                Box::new(handlers::forge_url::BlobUrlHandler),
                Box::new(handlers::forge_url::TreeUrlHandler),
                Box::new(handlers::shorthand::ShorthandCommitHandler),
                Box::new(handlers::shorthand::ShorthandTagHandler),
                Box::new(handlers::shorthand::ShorthandPathHandler),
                Box::new(handlers::shorthand::ShorthandHandler),
                Box::new(handlers::local::AbsolutePathHandler),
                Box::new(handlers::local::RelativePathHandler),
                Box::new(handlers::template::FallbackHandler),
            ],
        }
    }

    fn find_handler(&self, ctx: &Context, reference: &str) -> Option<&dyn ReferenceHandler> {
        self.handlers
            .iter()
            .map(AsRef::as_ref)
            .find(|h| h.can_handle(ctx, reference))
    }

    /// Install a single reference.
    pub async fn install(&self, ctx: &Context, reference: &str) -> Result<InstallOutcome> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(RulesError::ReferenceType {
                reference: String::new(),
                reason: "empty reference".to_string(),
            }
            .into());
        }
        ctx.cancel.check()?;

        match self.resolve(ctx, reference).await? {
            HandlerOutcome::One(resolved) => self.commit_single(ctx, resolved),
            HandlerOutcome::Batch { rules, errored } => self.commit_batch(ctx, rules, errored),
        }
    }

    /// Resolve a reference to records and content without touching the
    /// rules directory or the lockfile. The upgrade engine uses this to
    /// re-resolve a rule against its origin.
    pub async fn resolve(&self, ctx: &Context, reference: &str) -> Result<HandlerOutcome> {
        let handler = self.find_handler(ctx, reference).ok_or_else(|| {
            RulesError::ReferenceType {
                reference: reference.to_string(),
                reason: "no handler recognizes this reference".to_string(),
            }
        })?;
        debug!(handler = handler.name(), reference, "resolving reference");

        match handler.process(ctx, reference).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => match error.downcast_ref::<RulesError>() {
                Some(RulesError::TemplateFound { category, name }) => {
                    let (category, name) = (category.clone(), name.clone());
                    debug!(category, name, "redirecting to built-in template");
                    Ok(HandlerOutcome::One(self.resolve_builtin(ctx, &category, &name)?))
                }
                _ => Err(error),
            },
        }
    }

    /// Install several references serially, collecting per-reference
    /// failures instead of aborting the batch.
    pub async fn install_many(&self, ctx: &Context, references: &[String]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for reference in references {
            match self.install(ctx, reference).await {
                Ok(outcome) => report.outcomes.push((reference.clone(), outcome)),
                Err(error) => {
                    warn!(reference, error = %error, "reference failed to install");
                    report.failures.push((reference.clone(), format!("{error:#}")));
                }
            }
        }
        Ok(report)
    }

    /// Install a built-in template by category and key.
    pub async fn install_builtin(
        &self,
        ctx: &Context,
        category: &str,
        name: &str,
    ) -> Result<InstallOutcome> {
        let resolved = self.resolve_builtin(ctx, category, name)?;
        self.commit_single(ctx, resolved)
    }

    /// Remove an installed rule: unlink its artifacts, drop its record.
    pub fn remove(&self, ctx: &Context, key: &str) -> Result<RuleRecord> {
        let store = ctx.store();
        let mut lockfile = store.load()?;
        let record = lockfile.remove(key).ok_or_else(|| RulesError::RuleNotFound {
            key: key.to_string(),
        })?;
        installer::remove_artifacts(ctx, &record)?;
        store.save(&mut lockfile)?;
        Ok(record)
    }

    pub(crate) fn resolve_builtin(
        &self,
        ctx: &Context,
        category: &str,
        name: &str,
    ) -> Result<ResolvedRule> {
        let content = ctx.templates.get(category, name).ok_or_else(|| {
            RulesError::ReferenceType {
                reference: name.to_string(),
                reason: format!("no built-in template {category}/{name}"),
            }
        })?;
        let record = RuleRecord {
            key: crate::reference::key::key_for_builtin(name),
            source_type: SourceType::BuiltIn,
            reference: name.to_string(),
            category: Some(category.to_string()),
            git_ref: None,
            local_files: Vec::new(),
            resolved_commit: None,
            content_sha256: None,
            glob_pattern: None,
        };
        Ok(ResolvedRule::single(record, content.into_bytes()))
    }

    pub(crate) fn commit_single(&self, ctx: &Context, resolved: ResolvedRule) -> Result<InstallOutcome> {
        let store = ctx.store();
        let mut lockfile = store.load()?;

        if let Some(existing) = lockfile.get(&resolved.record.key) {
            if records_match(existing, &resolved.record) {
                debug!(key = %existing.key, "already installed, nothing to do");
                return Ok(InstallOutcome::AlreadyInstalled {
                    key: existing.key.clone(),
                });
            }
            warn!(
                key = %existing.key,
                "already installed with different content; run 'cursor-rules upgrade {}'",
                existing.key
            );
            return Ok(InstallOutcome::Drifted {
                key: existing.key.clone(),
            });
        }

        ctx.cancel.check()?;
        for (entry, content) in &resolved.files {
            installer::write_artifact(ctx, entry, content)?;
        }
        lockfile.push(resolved.record.clone());
        store.save(&mut lockfile)?;
        Ok(InstallOutcome::Installed(resolved.record))
    }

    fn commit_batch(
        &self,
        ctx: &Context,
        rules: Vec<ResolvedRule>,
        errored: usize,
    ) -> Result<InstallOutcome> {
        let store = ctx.store();
        let mut lockfile = store.load()?;
        let mut added = 0usize;
        let mut skipped = 0usize;
        let mut seen = std::collections::HashSet::new();

        ctx.cancel.check()?;
        for resolved in rules {
            // First occurrence wins within a batch.
            if !seen.insert(resolved.record.key.clone()) {
                skipped += 1;
                continue;
            }
            if lockfile.contains(&resolved.record.key) {
                debug!(key = %resolved.record.key, "skipping already installed rule");
                skipped += 1;
                continue;
            }
            for (entry, content) in &resolved.files {
                installer::write_artifact(ctx, entry, content)?;
            }
            lockfile.push(resolved.record);
            added += 1;
        }

        if added > 0 {
            store.save(&mut lockfile)?;
        }
        Ok(InstallOutcome::GlobCompleted {
            added,
            skipped,
            errored,
        })
    }
}

/// Whether an existing record and a freshly resolved one agree: pinned
/// commits are compared when both sides have one, content hashes when
/// both sides have one.
fn records_match(existing: &RuleRecord, incoming: &RuleRecord) -> bool {
    if let (Some(a), Some(b)) = (&existing.resolved_commit, &incoming.resolved_commit) {
        if a != b {
            return false;
        }
    }
    if let (Some(a), Some(b)) = (&existing.content_sha256, &incoming.content_sha256) {
        if a != b {
            return false;
        }
    }
    true
}
