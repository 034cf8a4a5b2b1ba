//! Share: export the lockfile as a portable, privacy-preserving manifest.
//!
//! The manifest carries no machine-local provenance (no file paths, no
//! checksums, no resolved commits). Forge-backed and built-in rules are
//! exported as references that re-resolve anywhere; local rules are
//! unshareable by default, or have their bytes embedded when the caller
//! asks for it. Rules whose origin cannot be reproduced elsewhere are
//! marked `unshareable` rather than dropped, so the receiving side can
//! report them.

pub mod restore;

use anyhow::{Context as _, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Context;
use crate::constants::SHARE_FORMAT_VERSION;
use crate::models::{RuleRecord, ShareableLock, ShareableRule, SourceType};
use crate::utils::fs::atomic_write;

/// Human summary of an export, printed alongside the machine manifest.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShareSummary {
    /// Exported rule count per source type label.
    pub by_source: BTreeMap<&'static str, usize>,
    /// Rules exported with embedded content.
    pub embedded: usize,
    /// Rules marked unshareable.
    pub unshareable: usize,
}

fn shareable_base(record: &RuleRecord) -> ShareableRule {
    ShareableRule {
        key: record.key.clone(),
        source_type: record.source_type,
        reference: record.reference.clone(),
        category: record.category.clone(),
        git_ref: record.git_ref.clone(),
        unshareable: false,
        content: None,
        filename: None,
    }
}

/// Read the bytes to embed for a local rule: the installed artifact is
/// authoritative; the original source path is the fallback.
fn embeddable_content(ctx: &Context, record: &RuleRecord) -> Option<String> {
    let artifact = record
        .local_files
        .first()
        .map(|entry| ctx.artifact_path(entry))
        .filter(|p| p.exists());
    let source = crate::reference::local_path(&record.reference, &ctx.base_dir);
    let path = artifact.or_else(|| source.exists().then_some(source))?;

    match fs::read(&path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                warn!(key = %record.key, "rule content is not UTF-8; cannot embed");
                None
            }
        },
        Err(error) => {
            warn!(key = %record.key, error = %error, "cannot read rule content for embedding");
            None
        }
    }
}

fn original_filename(record: &RuleRecord) -> Option<String> {
    Path::new(&record.reference)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Project the lockfile into a share manifest.
pub fn export(ctx: &Context, embed: bool) -> Result<(ShareableLock, ShareSummary)> {
    let lockfile = ctx.store().load()?;
    let mut summary = ShareSummary::default();
    let mut rules = Vec::with_capacity(lockfile.rules.len());

    for record in &lockfile.rules {
        let mut rule = shareable_base(record);
        match record.source_type {
            SourceType::BuiltIn
            | SourceType::ForgeFile
            | SourceType::ForgeShorthand
            | SourceType::ForgeRepoPath => {
                // Portable as a reference.
            }
            SourceType::LocalAbsolute | SourceType::LocalRelative => {
                if embed {
                    match embeddable_content(ctx, record) {
                        Some(content) => {
                            rule.content = Some(content);
                            rule.filename = original_filename(record);
                            summary.embedded += 1;
                        }
                        None => rule.unshareable = true,
                    }
                } else {
                    rule.unshareable = true;
                }
            }
            // Glob buckets and reserved directory sources do not
            // re-materialize deterministically elsewhere.
            _ => rule.unshareable = true,
        }

        if rule.unshareable {
            summary.unshareable += 1;
        }
        *summary.by_source.entry(record.source_type.label()).or_insert(0) += 1;
        debug!(key = %rule.key, unshareable = rule.unshareable, "exported rule");
        rules.push(rule);
    }

    Ok((
        ShareableLock {
            format_version: SHARE_FORMAT_VERSION,
            rules,
        },
        summary,
    ))
}

/// Serialize a manifest to pretty JSON and write it atomically.
pub fn write_manifest(path: &Path, manifest: &ShareableLock) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("Failed to serialize share manifest")?;
    atomic_write(path, json.as_bytes())
        .with_context(|| format!("Failed to write share manifest: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::test_utils::{MockForgeClient, ScriptedPrompter, TestProject};
    use std::sync::Arc;

    const HEAD: &str = "0123456789abcdef0123456789abcdef01234567";

    async fn seeded_project() -> (TestProject, Context) {
        let project = TestProject::new();
        let forge = MockForgeClient::new()
            .with_file(
                "alice",
                crate::constants::COLLECTION_REPO,
                "main",
                "foo.mdc",
                b"# foo",
            )
            .with_head("alice", crate::constants::COLLECTION_REPO, "main", HEAD);
        let ctx = project.context_with(Arc::new(forge), Arc::new(ScriptedPrompter::always_yes()));

        project.write_file("rules/own.mdc", b"# mine");
        let resolver = Resolver::new();
        resolver.install(&ctx, "alice/foo").await.unwrap();
        resolver.install(&ctx, "./rules/own.mdc").await.unwrap();
        (project, ctx)
    }

    #[tokio::test]
    async fn export_sanitizes_machine_local_fields() {
        let (_project, ctx) = seeded_project().await;
        let (manifest, summary) = export(&ctx, false).unwrap();

        assert_eq!(manifest.format_version, 1);
        assert_eq!(manifest.rules.len(), 2);

        let forge_rule = manifest.rules.iter().find(|r| r.key == "alice/foo").unwrap();
        assert!(!forge_rule.unshareable);
        assert!(forge_rule.content.is_none());

        let local_rule = manifest
            .rules
            .iter()
            .find(|r| r.key == "local/rel/rules-own")
            .unwrap();
        assert!(local_rule.unshareable);
        assert_eq!(summary.unshareable, 1);
        assert_eq!(summary.embedded, 0);

        // No provenance leaks into the wire form.
        let json = serde_json::to_value(&manifest).unwrap();
        let rules = json["rules"].as_array().unwrap();
        for rule in rules {
            assert!(rule.get("localFiles").is_none());
            assert!(rule.get("resolvedCommit").is_none());
            assert!(rule.get("contentSHA256").is_none());
        }
    }

    #[tokio::test]
    async fn embedding_inlines_local_rules() {
        let (_project, ctx) = seeded_project().await;
        let (manifest, summary) = export(&ctx, true).unwrap();

        let local_rule = manifest
            .rules
            .iter()
            .find(|r| r.key == "local/rel/rules-own")
            .unwrap();
        assert!(!local_rule.unshareable);
        assert_eq!(local_rule.content.as_deref(), Some("# mine"));
        assert_eq!(local_rule.filename.as_deref(), Some("own.mdc"));
        assert_eq!(summary.embedded, 1);
        assert_eq!(summary.unshareable, 0);
    }

    #[tokio::test]
    async fn manifest_writes_as_pretty_json() {
        let (project, ctx) = seeded_project().await;
        let (manifest, _) = export(&ctx, true).unwrap();
        let path = project.root().join("shared.json");
        write_manifest(&path, &manifest).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"formatVersion\": 1"));
        let parsed: ShareableLock = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, manifest);
    }
}
