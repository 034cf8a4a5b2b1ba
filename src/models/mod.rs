//! Shared data models: installed-rule records, source types, git ref
//! discriminators, and the share manifest projection.
//!
//! Wire names are camelCase and source type tags keep their historical
//! `github-` prefix; both are treated as opaque identifiers so existing
//! lockfiles keep parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::RULE_EXTENSION;

/// Origin of an installed rule.
///
/// Serialized with the historical kebab-case tags of the lockfile format
/// (`built-in`, `local-abs`, `github-shorthand`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// Installed from the built-in template registry.
    #[serde(rename = "built-in")]
    BuiltIn,
    /// Installed from an absolute local path.
    #[serde(rename = "local-abs")]
    LocalAbsolute,
    /// Installed from a relative local path.
    #[serde(rename = "local-rel")]
    LocalRelative,
    /// Installed from a full blob URL on the forge.
    #[serde(rename = "github-file")]
    ForgeFile,
    /// Reserved: a tree URL on the forge. The handler slot is registered
    /// but processing returns a defined error.
    #[serde(rename = "github-dir")]
    ForgeDirectory,
    /// Installed from a `user/rule` shorthand against the collection repo.
    #[serde(rename = "github-shorthand")]
    ForgeShorthand,
    /// Installed from a `user/repo/path...` shorthand naming a repository.
    #[serde(rename = "github-repo-path")]
    ForgeRepoPath,
    /// Installed from a glob over the collection repo.
    #[serde(rename = "github-glob")]
    ForgeGlob,
}

impl SourceType {
    /// Whether rules of this type can be re-fetched from the forge.
    #[must_use]
    pub fn is_forge(self) -> bool {
        matches!(
            self,
            Self::ForgeFile
                | Self::ForgeDirectory
                | Self::ForgeShorthand
                | Self::ForgeRepoPath
                | Self::ForgeGlob
        )
    }

    /// Whether rules of this type originate on the local filesystem.
    #[must_use]
    pub fn is_local(self) -> bool {
        matches!(self, Self::LocalAbsolute | Self::LocalRelative)
    }

    /// Human label used by `list` output.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::BuiltIn => "built-in",
            Self::LocalAbsolute => "local (absolute)",
            Self::LocalRelative => "local (relative)",
            Self::ForgeFile => "github file",
            Self::ForgeDirectory => "github directory",
            Self::ForgeShorthand => "github shorthand",
            Self::ForgeRepoPath => "github repo path",
            Self::ForgeGlob => "github glob",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ref discriminator for forge sources, encoded on the wire as
/// `branch=<name>`, `commit=<sha>`, or `tag=<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    /// Track the head of a branch; upgrades chase new commits.
    Branch(String),
    /// Pinned to an exact commit; upgrades require an explicit unpin.
    Commit(String),
    /// Pinned to a tag.
    Tag(String),
}

impl GitRef {
    /// The branch name, when tracking a branch.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name),
            _ => None,
        }
    }

    /// The pinned commit, when pinned.
    #[must_use]
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::Commit(sha) => Some(sha),
            _ => None,
        }
    }

    /// The ref string handed to the forge when fetching content.
    #[must_use]
    pub fn fetch_ref(&self) -> &str {
        match self {
            Self::Branch(name) | Self::Commit(name) | Self::Tag(name) => name,
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "branch={name}"),
            Self::Commit(sha) => write!(f, "commit={sha}"),
            Self::Tag(name) => write!(f, "tag={name}"),
        }
    }
}

impl FromStr for GitRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some(("branch", name)) => Ok(Self::Branch(name.to_string())),
            Some(("commit", sha)) => Ok(Self::Commit(sha.to_string())),
            Some(("tag", name)) => Ok(Self::Tag(name.to_string())),
            _ => Err(format!("invalid git ref discriminator: {s}")),
        }
    }
}

impl Serialize for GitRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GitRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single installed rule as persisted in the lockfile.
///
/// Created by the resolver on install, mutated only by the upgrade engine,
/// removed by the remove operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    /// Canonical, filesystem-safe identifier. May contain `/` to form a
    /// hierarchical path under the rules directory.
    pub key: String,

    /// Origin of the rule.
    pub source_type: SourceType,

    /// The exact user-supplied reference, preserved verbatim for
    /// re-resolution and display.
    pub reference: String,

    /// Template category, only for built-in rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Ref discriminator for forge sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<GitRef>,

    /// Artifact paths produced by this rule, relative to the rules
    /// directory (absolute paths are tolerated). Typically one entry.
    #[serde(default)]
    pub local_files: Vec<String>,

    /// Full-length commit pinned at install time for branch-tracked forge
    /// sources, enabling reproducible upgrades.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_commit: Option<String>,

    /// Hex SHA-256 of the authoritative content at the last install or
    /// upgrade; used to detect local edits.
    #[serde(
        default,
        rename = "contentSHA256",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_sha256: Option<String>,

    /// Original glob pattern when this record came from a glob install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob_pattern: Option<String>,
}

impl RuleRecord {
    /// Minimal record for a key discovered without provenance, used when
    /// lifting legacy lockfiles and when adopting files found on disk.
    #[must_use]
    pub fn minimal(key: &str) -> Self {
        Self {
            key: key.to_string(),
            source_type: SourceType::BuiltIn,
            reference: key.to_string(),
            category: None,
            git_ref: None,
            local_files: vec![format!("{key}.{RULE_EXTENSION}")],
            resolved_commit: None,
            content_sha256: None,
            glob_pattern: None,
        }
    }
}

/// A rule projected for export into a share manifest.
///
/// Provenance that only makes sense on the originating machine
/// (`local_files`, `resolved_commit`, checksums, glob patterns) is dropped;
/// content may be embedded instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableRule {
    /// Canonical rule key.
    pub key: String,

    /// Origin of the rule.
    pub source_type: SourceType,

    /// Original reference, used to re-install on the importing side.
    pub reference: String,

    /// Template category, only for built-in rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Ref discriminator for forge sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<GitRef>,

    /// Marked when the rule cannot be reproduced elsewhere (for example a
    /// local path without embedded content).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unshareable: bool,

    /// Rule bytes inlined into the manifest, for local rules exported with
    /// embedding enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Original file name accompanying embedded content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

/// The portable share manifest: a format version plus exported rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableLock {
    /// Manifest format version; only `1` is accepted.
    pub format_version: u32,

    /// Exported rules, in lockfile order.
    pub rules: Vec<ShareableRule>,
}
