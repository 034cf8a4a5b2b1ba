//! Handlers for shorthand references resolved against a user's
//! collection repository: `user/rule`, `user/rule:<sha>`, `user/rule@<tag>`,
//! and the 3+-segment `user/path/rule` form.
//!
//! The two-segment form deliberately has no nested-path fallback: a 404
//! on `user/rule` is final, and users who want `user/rule/rule` layouts
//! must spell out the segments. The 3+-segment form does try the
//! same-named-folder layout and a repository interpretation before giving
//! up, reporting every attempted location on failure.

use anyhow::Result;
use futures::future::BoxFuture;

use super::{forge_error, resolve_head};
use crate::config::Context;
use crate::constants::{COLLECTION_REPO, DEFAULT_BRANCH};
use crate::core::RulesError;
use crate::forge::{FetchError, raw_url};
use crate::models::{GitRef, RuleRecord, SourceType};
use crate::reference::key::{
    key_for_shorthand, key_for_shorthand_commit, key_for_shorthand_path, key_for_shorthand_tag,
};
use crate::reference::{Classification, RefSuffix, classify};
use crate::resolver::{HandlerOutcome, ReferenceHandler, ResolvedRule};

fn shorthand_record(
    key: String,
    source_type: SourceType,
    reference: &str,
    git_ref: GitRef,
    resolved_commit: Option<String>,
) -> RuleRecord {
    RuleRecord {
        key,
        source_type,
        reference: reference.to_string(),
        category: None,
        git_ref: Some(git_ref),
        local_files: Vec::new(),
        resolved_commit,
        content_sha256: None,
        glob_pattern: None,
    }
}

/// Fetch `<rule>.mdc` from a user's collection repo at a ref.
pub(crate) async fn fetch_collection_file(
    ctx: &Context,
    user: &str,
    git_ref: &str,
    path: &str,
) -> Result<Vec<u8>, FetchError> {
    ctx.forge
        .fetch_raw(user, COLLECTION_REPO, git_ref, path, &ctx.cancel)
        .await
}

/// Handles the plain two-segment `user/rule` shorthand.
pub struct ShorthandHandler;

impl ReferenceHandler for ShorthandHandler {
    fn name(&self) -> &'static str {
        "shorthand"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::Shorthand { .. }
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let Classification::Shorthand { user, rule } = classify(reference, &ctx.base_dir)
            else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "not a shorthand reference".to_string(),
                }
                .into());
            };

            let path = format!("{rule}.mdc");
            // No fallback to `user/rule/rule` here: 404 is final for the
            // two-segment form.
            let content = fetch_collection_file(ctx, &user, DEFAULT_BRANCH, &path)
                .await
                .map_err(|e| forge_error(reference, e))?;

            let head = resolve_head(ctx, &user, COLLECTION_REPO, DEFAULT_BRANCH).await;
            let record = shorthand_record(
                key_for_shorthand(&user, &rule),
                SourceType::ForgeShorthand,
                reference,
                GitRef::Branch(DEFAULT_BRANCH.to_string()),
                head,
            );
            Ok(HandlerOutcome::One(ResolvedRule::single(record, content)))
        })
    }
}

/// Handles `user/rule:<hex>` commit-pinned shorthands.
pub struct ShorthandCommitHandler;

impl ReferenceHandler for ShorthandCommitHandler {
    fn name(&self) -> &'static str {
        "shorthand-commit"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::ShorthandCommit { .. }
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let Classification::ShorthandCommit { user, rule, sha } =
                classify(reference, &ctx.base_dir)
            else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "not a commit-pinned shorthand".to_string(),
                }
                .into());
            };

            let path = format!("{rule}.mdc");
            let content = fetch_collection_file(ctx, &user, &sha, &path)
                .await
                .map_err(|e| forge_error(reference, e))?;

            // Pinned installs record no resolved commit; the pin itself is
            // the provenance.
            let record = shorthand_record(
                key_for_shorthand_commit(&user, &rule, &sha),
                SourceType::ForgeShorthand,
                reference,
                GitRef::Commit(sha),
                None,
            );
            Ok(HandlerOutcome::One(ResolvedRule::single(record, content)))
        })
    }
}

/// Handles `user/rule@<tag>` tag-pinned shorthands.
pub struct ShorthandTagHandler;

impl ReferenceHandler for ShorthandTagHandler {
    fn name(&self) -> &'static str {
        "shorthand-tag"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::ShorthandTag { .. }
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let Classification::ShorthandTag { user, rule, tag } =
                classify(reference, &ctx.base_dir)
            else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "not a tag-pinned shorthand".to_string(),
                }
                .into());
            };

            let path = format!("{rule}.mdc");
            let content = fetch_collection_file(ctx, &user, &tag, &path)
                .await
                .map_err(|e| forge_error(reference, e))?;

            let record = shorthand_record(
                key_for_shorthand_tag(&user, &rule, &tag),
                SourceType::ForgeShorthand,
                reference,
                GitRef::Tag(tag),
                None,
            );
            Ok(HandlerOutcome::One(ResolvedRule::single(record, content)))
        })
    }
}

/// One candidate location for a shorthand path.
struct PathAttempt {
    repo: String,
    path: String,
    source_type: SourceType,
}

/// Handles 3+-segment shorthand paths, trying the collection repo flat
/// layout, the same-named-folder layout, then a repository
/// interpretation of the first segment.
pub struct ShorthandPathHandler;

impl ReferenceHandler for ShorthandPathHandler {
    fn name(&self) -> &'static str {
        "shorthand-path"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::ShorthandPath { .. }
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let Classification::ShorthandPath {
                user,
                segments,
                suffix,
            } = classify(reference, &ctx.base_dir)
            else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "not a shorthand path".to_string(),
                }
                .into());
            };

            let fetch_ref = match &suffix {
                Some(RefSuffix::Commit(sha)) => sha.clone(),
                Some(RefSuffix::Tag(tag)) => tag.clone(),
                None => DEFAULT_BRANCH.to_string(),
            };
            let joined = segments.join("/");
            let Some(last) = segments.last().cloned() else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "shorthand path has no segments".to_string(),
                }
                .into());
            };

            let attempts = [
                PathAttempt {
                    repo: COLLECTION_REPO.to_string(),
                    path: format!("{joined}.mdc"),
                    source_type: SourceType::ForgeShorthand,
                },
                PathAttempt {
                    repo: COLLECTION_REPO.to_string(),
                    path: format!("{joined}/{last}.mdc"),
                    source_type: SourceType::ForgeShorthand,
                },
                PathAttempt {
                    repo: segments[0].clone(),
                    path: format!("{}.mdc", segments[1..].join("/")),
                    source_type: SourceType::ForgeRepoPath,
                },
            ];

            let mut tried = Vec::with_capacity(attempts.len());
            for attempt in attempts {
                let url = raw_url(&user, &attempt.repo, &fetch_ref, &attempt.path);
                match ctx
                    .forge
                    .fetch_raw(&user, &attempt.repo, &fetch_ref, &attempt.path, &ctx.cancel)
                    .await
                {
                    Ok(content) => {
                        let (git_ref, resolved_commit) = match &suffix {
                            Some(RefSuffix::Commit(sha)) => (GitRef::Commit(sha.clone()), None),
                            Some(RefSuffix::Tag(tag)) => (GitRef::Tag(tag.clone()), None),
                            None => {
                                let head =
                                    resolve_head(ctx, &user, &attempt.repo, DEFAULT_BRANCH).await;
                                (GitRef::Branch(DEFAULT_BRANCH.to_string()), head)
                            }
                        };
                        let record = shorthand_record(
                            key_for_shorthand_path(&user, &segments, suffix.as_ref()),
                            attempt.source_type,
                            reference,
                            git_ref,
                            resolved_commit,
                        );
                        return Ok(HandlerOutcome::One(ResolvedRule::single(record, content)));
                    }
                    Err(FetchError::NotFound { .. }) => tried.push(url),
                    Err(other) => return Err(forge_error(reference, other)),
                }
            }

            Err(RulesError::ForgeAccess {
                reference: reference.to_string(),
                reason: format!("not found; tried {}", tried.join(", ")),
            }
            .into())
        })
    }
}
