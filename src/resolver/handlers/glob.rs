//! Glob handlers: local filesystem expansion and forge-side tree
//! matching. Both produce a batch outcome that the resolver commits with
//! a single lockfile save.

use anyhow::Result;
use futures::future::BoxFuture;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::{forge_error, resolve_head};
use crate::config::Context;
use crate::constants::{COLLECTION_REPO, DEFAULT_BRANCH, RULE_EXTENSION};
use crate::core::RulesError;
use crate::models::{GitRef, RuleRecord, SourceType};
use crate::reference::key::{key_for_absolute, key_for_blob, key_for_relative};
use crate::reference::{BlobRef, is_glob};
use crate::resolver::{HandlerOutcome, ReferenceHandler, ResolvedRule};

/// Whether a glob pattern should be expanded against the forge rather
/// than the local filesystem: it has a plausible `<user>/` prefix that
/// does not name a local directory and is not an explicit local form.
fn is_forge_glob(ctx: &Context, pattern: &str) -> bool {
    if pattern.starts_with('/')
        || pattern.starts_with("./")
        || pattern.starts_with("../")
        || pattern.starts_with("~")
    {
        return false;
    }
    let Some((first, rest)) = pattern.split_once('/') else {
        return false;
    };
    if rest.is_empty() || is_glob(first) {
        return false;
    }
    if !first
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return false;
    }
    !ctx.base_dir.join(first).is_dir()
}

/// Expands a glob against the local filesystem and installs every
/// matching `.mdc` file.
pub struct LocalGlobHandler;

impl ReferenceHandler for LocalGlobHandler {
    fn name(&self) -> &'static str {
        "glob-local"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        is_glob(reference) && !is_forge_glob(ctx, reference)
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let expanded = shellexpand::tilde(reference).into_owned();
            let absolute = Path::new(&expanded).is_absolute();
            let full_pattern = if absolute {
                expanded.clone()
            } else {
                ctx.base_dir.join(&expanded).to_string_lossy().into_owned()
            };

            let entries = glob::glob(&full_pattern).map_err(|e| RulesError::ReferenceType {
                reference: reference.to_string(),
                reason: format!("invalid glob pattern: {e}"),
            })?;

            let mut matches = Vec::new();
            let mut errored = 0usize;
            for entry in entries {
                match entry {
                    Ok(path) => matches.push(path),
                    Err(error) => {
                        warn!(error = %error, "unreadable path while expanding glob");
                        errored += 1;
                    }
                }
            }
            matches.retain(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(RULE_EXTENSION)
            });
            matches.sort();
            debug!(pattern = reference, count = matches.len(), "expanded local glob");

            let mut rules = Vec::with_capacity(matches.len());
            for path in matches {
                let (key, source_type, file_reference) = if absolute {
                    (
                        key_for_absolute(&path),
                        SourceType::LocalAbsolute,
                        path.to_string_lossy().into_owned(),
                    )
                } else {
                    let relative = path.strip_prefix(&ctx.base_dir).unwrap_or(&path);
                    let rel_str = crate::utils::normalize_path_for_storage(relative);
                    (
                        key_for_relative(&rel_str),
                        SourceType::LocalRelative,
                        rel_str,
                    )
                };

                match fs::read(&path) {
                    Ok(content) => {
                        let record = RuleRecord {
                            key,
                            source_type,
                            reference: file_reference,
                            category: None,
                            git_ref: None,
                            local_files: Vec::new(),
                            resolved_commit: None,
                            content_sha256: None,
                            glob_pattern: Some(reference.to_string()),
                        };
                        rules.push(ResolvedRule::single(record, content));
                    }
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "failed to read glob match");
                        errored += 1;
                    }
                }
            }

            Ok(HandlerOutcome::Batch { rules, errored })
        })
    }
}

/// Expands a glob against a user's collection repository on the forge.
pub struct ForgeGlobHandler;

impl ReferenceHandler for ForgeGlobHandler {
    fn name(&self) -> &'static str {
        "glob-forge"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        is_glob(reference) && is_forge_glob(ctx, reference)
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let Some((user, pattern)) = reference.split_once('/') else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "forge glob requires a leading <user>/ segment".to_string(),
                }
                .into());
            };

            let mut paths = ctx
                .forge
                .list_tree(user, COLLECTION_REPO, DEFAULT_BRANCH, pattern, &ctx.cancel)
                .await
                .map_err(|e| forge_error(reference, e))?;
            paths.retain(|p| p.ends_with(&format!(".{RULE_EXTENSION}")));
            paths.sort();
            debug!(pattern = reference, count = paths.len(), "matched forge glob");

            let head = resolve_head(ctx, user, COLLECTION_REPO, DEFAULT_BRANCH).await;

            let mut rules = Vec::with_capacity(paths.len());
            let mut errored = 0usize;
            for path in paths {
                match ctx
                    .forge
                    .fetch_raw(user, COLLECTION_REPO, DEFAULT_BRANCH, &path, &ctx.cancel)
                    .await
                {
                    Ok(content) => {
                        let blob = BlobRef {
                            owner: user.to_string(),
                            repo: COLLECTION_REPO.to_string(),
                            git_ref: DEFAULT_BRANCH.to_string(),
                            path: path.clone(),
                        };
                        let record = RuleRecord {
                            key: key_for_blob(&blob),
                            source_type: SourceType::ForgeGlob,
                            reference: reference.to_string(),
                            category: None,
                            git_ref: Some(GitRef::Branch(DEFAULT_BRANCH.to_string())),
                            local_files: Vec::new(),
                            resolved_commit: head.clone(),
                            content_sha256: None,
                            glob_pattern: Some(reference.to_string()),
                        };
                        rules.push(ResolvedRule::single(record, content));
                    }
                    Err(error) => {
                        warn!(path, error = %error, "failed to fetch forge glob match");
                        errored += 1;
                    }
                }
            }

            Ok(HandlerOutcome::Batch { rules, errored })
        })
    }
}
