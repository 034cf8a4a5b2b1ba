//! Handlers for local file references, absolute and relative.

use anyhow::Result;
use futures::future::BoxFuture;
use std::fs;
use std::path::Path;

use crate::config::Context;
use crate::core::RulesError;
use crate::models::{RuleRecord, SourceType};
use crate::reference::key::{key_for_absolute, key_for_relative};
use crate::reference::{Classification, classify, local_path};
use crate::resolver::{HandlerOutcome, ReferenceHandler, ResolvedRule};

/// Read a local rule file and resolve it under the given key.
pub(crate) fn read_local_rule(
    reference: &str,
    path: &Path,
    key: String,
    source_type: SourceType,
) -> Result<ResolvedRule> {
    if path.is_dir() {
        return Err(RulesError::ReferenceType {
            reference: reference.to_string(),
            reason: "path names a directory, not a rule file".to_string(),
        }
        .into());
    }
    let content = fs::read(path).map_err(|source| RulesError::LocalFileAccess {
        path: path.display().to_string(),
        source,
    })?;

    let record = RuleRecord {
        key,
        source_type,
        reference: reference.to_string(),
        category: None,
        git_ref: None,
        local_files: Vec::new(),
        resolved_commit: None,
        content_sha256: None,
        glob_pattern: None,
    };
    Ok(ResolvedRule::single(record, content))
}

/// Handles OS-absolute paths.
pub struct AbsolutePathHandler;

impl ReferenceHandler for AbsolutePathHandler {
    fn name(&self) -> &'static str {
        "local-absolute"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::AbsolutePath(_)
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let Classification::AbsolutePath(path) = classify(reference, &ctx.base_dir) else {
                return Err(RulesError::ReferenceType {
                    reference: reference.to_string(),
                    reason: "not an absolute path".to_string(),
                }
                .into());
            };
            let resolved = read_local_rule(
                reference,
                &path,
                key_for_absolute(&path),
                SourceType::LocalAbsolute,
            )?;
            Ok(HandlerOutcome::One(resolved))
        })
    }
}

/// Handles relative paths, resolved against the operation base directory.
pub struct RelativePathHandler;

impl ReferenceHandler for RelativePathHandler {
    fn name(&self) -> &'static str {
        "local-relative"
    }

    fn can_handle(&self, ctx: &Context, reference: &str) -> bool {
        matches!(
            classify(reference, &ctx.base_dir),
            Classification::RelativePath(_)
        )
    }

    fn process<'a>(
        &'a self,
        ctx: &'a Context,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<HandlerOutcome>> {
        Box::pin(async move {
            let path = local_path(reference, &ctx.base_dir);
            let resolved = read_local_rule(
                reference,
                &path,
                key_for_relative(reference),
                SourceType::LocalRelative,
            )?;
            Ok(HandlerOutcome::One(resolved))
        })
    }
}
