//! The handler registry members, one module per reference form, plus the
//! error-mapping helpers they share.

pub mod forge_url;
pub mod glob;
pub mod local;
pub mod shorthand;
pub mod template;

use tracing::warn;

use crate::config::Context;
use crate::core::RulesError;
use crate::forge::FetchError;

/// Map a forge fetch failure onto the user-facing taxonomy, attaching the
/// reference being processed. Rate limits keep their distinct kind.
pub(crate) fn forge_error(reference: &str, error: FetchError) -> anyhow::Error {
    match error {
        FetchError::RateLimited { reset } => RulesError::ForgeRateLimit {
            reference: reference.to_string(),
            reset,
        }
        .into(),
        other => RulesError::ForgeAccess {
            reference: reference.to_string(),
            reason: other.to_string(),
        }
        .into(),
    }
}

/// Resolve a branch head for provenance pinning. Failures are non-fatal:
/// the install proceeds without a pinned commit.
pub(crate) async fn resolve_head(
    ctx: &Context,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Option<String> {
    match ctx
        .forge
        .head_commit(owner, repo, branch, &ctx.cancel)
        .await
    {
        Ok(sha) => Some(sha),
        Err(error) => {
            warn!(owner, repo, branch, error = %error, "could not resolve branch head; continuing unpinned");
            None
        }
    }
}
