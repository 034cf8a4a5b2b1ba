//! Handlers for full forge URLs: blob URLs install a single file, tree
//! URLs are a reserved form that reports a defined error.

use anyhow::Result;
use futures::future::BoxFuture;

use super::{forge_error, resolve_head};
use crate::config::Context;
use crate::constants::FULL_COMMIT_LEN;
use crate::core::RulesError;
use crate::models::{GitRef, RuleRecord, SourceType};
use crate::reference::key::key_for_blob;
use crate::reference::{BlobRef, parse_blob_url, parse_tree_url};
use crate::resolver::{HandlerOutcome, ReferenceHandler, ResolvedRule};

/// Whether a URL ref segment is a full commit identifier. Branch chasing
/// relies on the full 40-character form; anything shorter is a branch or
/// tag name.
fn is_full_commit(git_ref: &str) -> bool {
    git_ref.len() == FULL_COMMIT_LEN && git_ref.chars().all(|c| c.is_ascii_hexdigit())
}

/// Fetch a blob and build its record; shared with the glob and shorthand
/// paths that bottom out in a blob fetch.
pub(crate) async fn install_blob(
    ctx: &Context,
    reference: &str,
    blob: &BlobRef,
    source_type: SourceType,
) -> Result<ResolvedRule> {
    let content = ctx
        .forge
        .fetch_raw(&blob.owner, &blob.repo, &blob.git_ref, &blob.path, &ctx.cancel)
        .await
        .map_err(|e| forge_error(reference, e))?;

    let (git_ref, resolved_commit) = if is_full_commit(&blob.git_ref) {
        (GitRef::Commit(blob.git_ref.clone()), None)
    } else {
        let head = resolve_head(ctx, &blob.owner, &blob.repo, &blob.git_ref).await;
        (GitRef::Branch(blob.git_ref.clone()), head)
    };

    let record = RuleRecord {
        key: key_for_blob(blob),
        source_type,
        reference: reference.to_string(),
        category: None,
        git_ref: Some(git_ref),
        local_files: Vec::new(),
        resolved_commit,
        content_sha256: None,
        glob_pattern: None,
    };
    Ok(ResolvedRule::single(record, content))
}

/// Handles `https://github.com/<owner>/<repo>/blob/<ref>/<path>` URLs.
pub struct BlobUrlHandler;

impl ReferenceHandler for BlobUrlHandler {
    fn name(&self) -> &'static str {
        "forge-blob-url"
    }

    fn can_handle(&self, _ctx: &Context, reference: &str) -> bool {
        parse_blob_url(reference).is_some()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let blob = parse_blob_url(reference).ok_or_else(|| RulesError::ReferenceType {
                reference: reference.to_string(),
                reason: "not a blob URL".to_string(),
            })?;
            let resolved = install_blob(ctx, reference, &blob, SourceType::ForgeFile).await?;
            Ok(HandlerOutcome::One(resolved))
        })
    }
}

/// Reserved handler for `/tree/` URLs. Registered so the slot exists,
/// but directory downloads are not supported.
pub struct TreeUrlHandler;

impl ReferenceHandler for TreeUrlHandler {
    fn name(&self) -> &'static str {
        "forge-tree-url"
    }

    fn can_handle(&self, _ctx: &Context, reference: &str) -> bool {
        parse_tree_url(reference).is_some()
    }

    fn process<'a>(
        &'a self,
        _ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            Err(RulesError::ReferenceType {
                reference: reference.to_string(),
                reason: "directory references are not supported; link a single file with /blob/"
                    .to_string(),
            }
            .into())
        })
    }
}
