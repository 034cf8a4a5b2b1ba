//! Canonical rule key derivation.
//!
//! Keys double as relative file paths under the rules directory (with
//! `.mdc` appended), so every derivation here must produce a
//! filesystem-safe string, deterministically. Hierarchy is expressed with
//! `/`; absolute-path keys hash the source directory so two files with the
//! same name from different directories never collide.

use sha2::{Digest, Sha256};
use std::path::Path;

use super::{BlobRef, Classification, RefSuffix, classify};
use crate::constants::{ABS_KEY_HASH_LEN, COLLECTION_REPO};

/// Key for a forge blob URL.
///
/// Files in a user's collection repo keep their in-repo path under the
/// user's namespace; files in any other repo are namespaced by repo and
/// keyed by filename alone.
#[must_use]
pub fn key_for_blob(blob: &BlobRef) -> String {
    if blob.repo == COLLECTION_REPO {
        let path = blob.path.strip_suffix(".mdc").unwrap_or(&blob.path);
        format!("{}/{path}", blob.owner)
    } else {
        let filename = blob.path.rsplit('/').next().unwrap_or(&blob.path);
        let stem = filename.split_once('.').map_or(filename, |(stem, _)| stem);
        format!("{}/{}/{stem}", blob.owner, blob.repo)
    }
}

/// Key for a plain two-segment shorthand.
#[must_use]
pub fn key_for_shorthand(user: &str, rule: &str) -> String {
    format!("{user}/{rule}")
}

/// Key for a commit-pinned shorthand.
#[must_use]
pub fn key_for_shorthand_commit(user: &str, rule: &str, sha: &str) -> String {
    format!("{user}/{rule}-{sha}")
}

/// Key for a tag-pinned shorthand.
#[must_use]
pub fn key_for_shorthand_tag(user: &str, rule: &str, tag: &str) -> String {
    format!("{user}/{rule}-{tag}")
}

/// Key for a 3+-segment shorthand path; a pin suffix on the last segment
/// becomes a `-<sha>` / `-<tag>` suffix on the key.
#[must_use]
pub fn key_for_shorthand_path(
    user: &str,
    segments: &[String],
    suffix: Option<&RefSuffix>,
) -> String {
    let mut key = format!("{user}/{}", segments.join("/"));
    match suffix {
        Some(RefSuffix::Commit(sha)) => {
            key.push('-');
            key.push_str(sha);
        }
        Some(RefSuffix::Tag(tag)) => {
            key.push('-');
            key.push_str(tag);
        }
        None => {}
    }
    key
}

/// Key for an absolute local path: `local/abs/<8-hex>/<stem>`, where the
/// hex digits hash the directory name.
#[must_use]
pub fn key_for_absolute(path: &Path) -> String {
    let dirname = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(dirname.as_bytes());
    let digest = hex::encode(hasher.finalize());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("local/abs/{}/{stem}", &digest[..ABS_KEY_HASH_LEN])
}

/// Strip any number of leading `./` and `../` components.
fn strip_dot_prefixes(reference: &str) -> &str {
    let mut rest = reference;
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("../") {
            rest = stripped;
        } else {
            return rest;
        }
    }
}

/// Key for a relative local path: separators become `-` and the file
/// extension is dropped (`a/b/name.ext` -> `local/rel/a-b-name`).
#[must_use]
pub fn key_for_relative(reference: &str) -> String {
    let trimmed = strip_dot_prefixes(reference);
    let components: Vec<&str> = trimmed.split('/').filter(|c| !c.is_empty()).collect();
    let mut parts: Vec<String> = Vec::with_capacity(components.len());
    for (i, component) in components.iter().enumerate() {
        if i == components.len() - 1 {
            let stem = Path::new(component)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| (*component).to_string());
            parts.push(stem);
        } else {
            parts.push((*component).to_string());
        }
    }
    format!("local/rel/{}", parts.join("-"))
}

/// Synthetic bucket key for a local glob pattern.
///
/// The non-glob directory prefix is joined with `-` and tagged with
/// `to-glob` (shallow) or `to-deep-glob` (pattern contains `**`).
#[must_use]
pub fn key_for_glob(pattern: &str) -> String {
    let deep = pattern.contains("**");
    let trimmed = strip_dot_prefixes(pattern);
    let dirs: Vec<&str> = trimmed
        .split('/')
        .take_while(|c| !super::is_glob(c))
        .filter(|c| !c.is_empty())
        .collect();
    let tag = if deep { "to-deep-glob" } else { "to-glob" };
    if dirs.is_empty() {
        format!("local/rel/{tag}")
    } else {
        format!("local/rel/{}-{tag}", dirs.join("-"))
    }
}

/// Key for a built-in template or fallback name.
#[must_use]
pub fn key_for_builtin(name: &str) -> String {
    format!("built-in/{name}")
}

/// Derive the canonical key for any reference string.
///
/// Pure given the filesystem state under `base_dir`; two invocations
/// produce identical output.
#[must_use]
pub fn canonical_key(reference: &str, base_dir: &Path) -> String {
    match classify(reference, base_dir) {
        Classification::Glob(pattern) => key_for_glob(&pattern),
        Classification::ForgeBlobUrl(blob) | Classification::ForgeTreeUrl(blob) => {
            key_for_blob(&blob)
        }
        Classification::ShorthandCommit { user, rule, sha } => {
            key_for_shorthand_commit(&user, &rule, &sha)
        }
        Classification::ShorthandTag { user, rule, tag } => {
            key_for_shorthand_tag(&user, &rule, &tag)
        }
        Classification::ShorthandPath {
            user,
            segments,
            suffix,
        } => key_for_shorthand_path(&user, &segments, suffix.as_ref()),
        Classification::Shorthand { user, rule } => key_for_shorthand(&user, &rule),
        Classification::AbsolutePath(path) => key_for_absolute(&path),
        Classification::RelativePath(path) => key_for_relative(&path.to_string_lossy()),
        Classification::Fallback(name) => key_for_builtin(&name),
    }
}
