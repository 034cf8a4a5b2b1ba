//! The last-chance handler for bare words: retry as a shorthand under
//! the configured default username, then look the word up in the
//! built-in template registry.
//!
//! A template hit is reported as the typed [`RulesError::TemplateFound`]
//! signal; the resolver intercepts it and performs the built-in install.

use anyhow::Result;
use futures::future::BoxFuture;
use tracing::debug;

use super::{forge_error, resolve_head};
use crate::config::Context;
use crate::constants::{COLLECTION_REPO, DEFAULT_BRANCH};
use crate::core::RulesError;
use crate::forge::FetchError;
use crate::models::{GitRef, RuleRecord, SourceType};
use crate::reference::key::key_for_shorthand;
use crate::reference::{Classification, classify};
use crate::resolver::{HandlerOutcome, ReferenceHandler, ResolvedRule};

/// Handles references no other handler claimed.
pub struct FallbackHandler;

impl ReferenceHandler for FallbackHandler {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::Fallback(_)
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            if let Some(user) = &ctx.default_username {
                let path = format!("{reference}.mdc");
                match ctx
                    .forge
                    .fetch_raw(user, COLLECTION_REPO, DEFAULT_BRANCH, &path, &ctx.cancel)
                    .await
                {
                    Ok(content) => {
                        debug!(user, reference, "bare word resolved under default username");
                        let head = resolve_head(ctx, user, COLLECTION_REPO, DEFAULT_BRANCH).await;
                        let record = RuleRecord {
                            key: key_for_shorthand(user, reference),
                            source_type: SourceType::ForgeShorthand,
                            reference: reference.to_string(),
                            category: None,
                            git_ref: Some(GitRef::Branch(DEFAULT_BRANCH.to_string())),
                            local_files: Vec::new(),
                            resolved_commit: head,
                            content_sha256: None,
                            glob_pattern: None,
                        };
                        return Ok(HandlerOutcome::One(ResolvedRule::single(record, content)));
                    }
                    Err(FetchError::NotFound { .. }) => {
                        debug!(user, reference, "not found under default username");
                    }
                    Err(other) => return Err(forge_error(reference, other)),
                }
            }

            if let Some((category, _)) = ctx.templates.find_by_name(reference) {
                return Err(RulesError::TemplateFound {
                    category,
                    name: reference.to_string(),
                }
                .into());
            }

            Err(RulesError::ReferenceType {
                reference: reference.to_string(),
                reason: "does not match any reference form or built-in template".to_string(),
            }
            .into())
        })
    }
}
