//! Reference classification: deciding what kind of thing a user-supplied
//! reference string names, and parsing out its structured pieces.
//!
//! Classification is a first-match-wins walk over the following shapes, in
//! exactly this order (the resolver registers its handlers in the same
//! order):
//!
//! 1. Glob pattern (contains `*`, `?`, `[`, or `]`)
//! 2. Forge blob URL (`https://github.com/<owner>/<repo>/blob/<ref>/<path>`)
//! 3. Forge tree URL (same with `/tree/`; reserved)
//! 4. Shorthand with commit (`user/rule:<hex>`)
//! 5. Shorthand with tag (`user/rule@<tag>`)
//! 6. Shorthand path, 3+ segments (`user/a/b`)
//! 7. Shorthand, 2 segments (`user/rule`)
//! 8. Absolute path
//! 9. Relative path
//! 10. Default-username / built-in template fallback
//!
//! The functions here are pure string work except for the path-existence
//! probes that disambiguate locally named folders from forge shorthands;
//! those probe against an explicit base directory so tests control them.
//!
//! Two hard rules keep the ambiguous cases deterministic: a string carrying
//! a file extension is never a shorthand, and a string whose first segment
//! names an existing local directory is always a local path.

pub mod key;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static BLOB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/blob/([^/]+)/(.+)$").unwrap()
});

static TREE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([^/]+)/([^/]+)/tree/([^/]+)/(.+)$").unwrap()
});

static SHORTHAND_COMMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_-]+)/([A-Za-z0-9_-]+):([0-9a-fA-F]+)$").unwrap()
});

static SHORTHAND_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_-]+)/([A-Za-z0-9_-]+)@([A-Za-z0-9._-]+)$").unwrap()
});

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// A blob or tree URL parsed into its forge coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch name, tag, or full commit as it appeared in the URL.
    pub git_ref: String,
    /// File path within the repository.
    pub path: String,
}

/// Optional ref suffix carried by the last segment of a shorthand path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSuffix {
    /// `:<hex>` commit pin.
    Commit(String),
    /// `@<tag>` tag pin.
    Tag(String),
}

/// The outcome of classifying a reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A glob pattern, local or forge; the handlers disambiguate.
    Glob(String),
    /// A blob URL on the forge.
    ForgeBlobUrl(BlobRef),
    /// A tree URL on the forge (reserved, rejected by its handler).
    ForgeTreeUrl(BlobRef),
    /// `user/rule:<hex>` commit-pinned shorthand.
    ShorthandCommit {
        /// Owner of the collection repo
        user: String,
        /// Rule name
        rule: String,
        /// Hex commit (any length; shorthand-only leniency)
        sha: String,
    },
    /// `user/rule@<tag>` tag-pinned shorthand.
    ShorthandTag {
        /// Owner of the collection repo
        user: String,
        /// Rule name
        rule: String,
        /// Tag name
        tag: String,
    },
    /// `user/a/b[...]` shorthand path with three or more segments.
    ShorthandPath {
        /// Owner (first segment)
        user: String,
        /// Remaining segments, suffix stripped from the last
        segments: Vec<String>,
        /// Optional commit/tag pin carried by the last segment
        suffix: Option<RefSuffix>,
    },
    /// Plain two-segment `user/rule` shorthand.
    Shorthand {
        /// Owner of the collection repo
        user: String,
        /// Rule name
        rule: String,
    },
    /// An OS-absolute local path.
    AbsolutePath(PathBuf),
    /// A relative local path (existing, or plausibly naming a file).
    RelativePath(PathBuf),
    /// A bare word: default-username retry, then template lookup.
    Fallback(String),
}

/// True when the string contains any glob metacharacter.
#[must_use]
pub fn is_glob(reference: &str) -> bool {
    reference.contains(['*', '?', '[', ']'])
}

/// Parse a forge blob URL into its coordinates.
#[must_use]
pub fn parse_blob_url(reference: &str) -> Option<BlobRef> {
    BLOB_URL_RE.captures(reference).map(|caps| BlobRef {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
        git_ref: caps[3].to_string(),
        path: caps[4].to_string(),
    })
}

/// Parse a forge tree URL into its coordinates.
#[must_use]
pub fn parse_tree_url(reference: &str) -> Option<BlobRef> {
    TREE_URL_RE.captures(reference).map(|caps| BlobRef {
        owner: caps[1].to_string(),
        repo: caps[2].to_string(),
        git_ref: caps[3].to_string(),
        path: caps[4].to_string(),
    })
}

/// Parse `user/rule:<hex>`. Short hex runs are accepted here and only
/// here; everywhere else a commit must be the full 40 characters.
#[must_use]
pub fn parse_shorthand_commit(reference: &str) -> Option<(String, String, String)> {
    SHORTHAND_COMMIT_RE
        .captures(reference)
        .map(|caps| (caps[1].to_string(), caps[2].to_string(), caps[3].to_lowercase()))
}

/// Parse `user/rule@<tag>`.
#[must_use]
pub fn parse_shorthand_tag(reference: &str) -> Option<(String, String, String)> {
    SHORTHAND_TAG_RE
        .captures(reference)
        .map(|caps| (caps[1].to_string(), caps[2].to_string(), caps[3].to_string()))
}

/// Split an optional `:<hex>` / `@<tag>` suffix off a path segment.
fn split_suffix(segment: &str) -> (String, Option<RefSuffix>) {
    if let Some((name, sha)) = segment.split_once(':') {
        if !sha.is_empty()
            && sha.chars().all(|c| c.is_ascii_hexdigit())
            && SEGMENT_RE.is_match(name)
        {
            return (name.to_string(), Some(RefSuffix::Commit(sha.to_lowercase())));
        }
    }
    if let Some((name, tag)) = segment.split_once('@') {
        if !tag.is_empty() && SEGMENT_RE.is_match(name) {
            return (name.to_string(), Some(RefSuffix::Tag(tag.to_string())));
        }
    }
    (segment.to_string(), None)
}

/// Parse a 3+-segment shorthand path, honoring an optional pin suffix on
/// the final segment. Returns `None` when any segment carries an extension
/// or otherwise fails the shorthand shape.
#[must_use]
pub fn parse_shorthand_path(reference: &str) -> Option<(String, Vec<String>, Option<RefSuffix>)> {
    let segments: Vec<&str> = reference.split('/').collect();
    if segments.len() < 3 {
        return None;
    }

    let mut parsed: Vec<String> = Vec::with_capacity(segments.len() - 1);
    let mut suffix = None;
    let last_index = segments.len() - 1;

    if !SEGMENT_RE.is_match(segments[0]) {
        return None;
    }
    for (i, &segment) in segments.iter().enumerate().skip(1) {
        // A trailing ".mdc" on the final segment is tolerated and stripped;
        // any other dotted segment disqualifies the shorthand shape.
        let cleaned = if i == last_index {
            segment.strip_suffix(".mdc").unwrap_or(segment)
        } else {
            segment
        };
        if i == last_index {
            let (name, found) = split_suffix(cleaned);
            if !SEGMENT_RE.is_match(&name) {
                return None;
            }
            suffix = found;
            parsed.push(name);
        } else {
            if !SEGMENT_RE.is_match(cleaned) {
                return None;
            }
            parsed.push(cleaned.to_string());
        }
    }

    Some((segments[0].to_string(), parsed, suffix))
}

/// Parse a plain two-segment `user/rule` shorthand.
#[must_use]
pub fn parse_shorthand(reference: &str) -> Option<(String, String)> {
    let (user, rule) = reference.split_once('/')?;
    if rule.contains('/') {
        return None;
    }
    if SEGMENT_RE.is_match(user) && SEGMENT_RE.is_match(rule) {
        Some((user.to_string(), rule.to_string()))
    } else {
        None
    }
}

/// Resolve a reference against a base directory, expanding `~`.
#[must_use]
pub fn local_path(reference: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(reference);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Whether the reference names an existing file or directory under the
/// base directory (or anywhere, when absolute).
#[must_use]
pub fn exists_locally(reference: &str, base_dir: &Path) -> bool {
    local_path(reference, base_dir).exists()
}

/// Whether the first path segment of the reference names an existing
/// local directory, which forces the relative-path interpretation.
#[must_use]
pub fn first_segment_is_local_dir(reference: &str, base_dir: &Path) -> bool {
    reference
        .split('/')
        .next()
        .filter(|seg| !seg.is_empty())
        .is_some_and(|seg| base_dir.join(seg).is_dir())
}

/// Whether the reference plausibly names a local file even though nothing
/// exists at that path yet: explicit `./`/`../` prefixes, path separators,
/// or a file extension.
#[must_use]
pub fn plausibly_local(reference: &str) -> bool {
    reference.starts_with("./")
        || reference.starts_with("../")
        || reference.starts_with("~/")
        || reference.contains('/')
        || Path::new(reference).extension().is_some()
}

/// Classify a reference string, first match wins.
///
/// `base_dir` anchors the path-existence probes; it is the directory user
/// references are interpreted against (the process working directory in
/// production, a temp dir in tests).
#[must_use]
pub fn classify(reference: &str, base_dir: &Path) -> Classification {
    if is_glob(reference) {
        return Classification::Glob(reference.to_string());
    }
    if let Some(blob) = parse_blob_url(reference) {
        return Classification::ForgeBlobUrl(blob);
    }
    if let Some(tree) = parse_tree_url(reference) {
        return Classification::ForgeTreeUrl(tree);
    }

    // Explicit pin forms win over every shorthand-without-ref shape.
    if !exists_locally(reference, base_dir) && !first_segment_is_local_dir(reference, base_dir) {
        if let Some((user, rule, sha)) = parse_shorthand_commit(reference) {
            return Classification::ShorthandCommit { user, rule, sha };
        }
        if let Some((user, rule, tag)) = parse_shorthand_tag(reference) {
            return Classification::ShorthandTag { user, rule, tag };
        }
        if let Some((user, segments, suffix)) = parse_shorthand_path(reference) {
            return Classification::ShorthandPath {
                user,
                segments,
                suffix,
            };
        }
        if let Some((user, rule)) = parse_shorthand(reference) {
            return Classification::Shorthand { user, rule };
        }
    }

    let expanded = shellexpand::tilde(reference);
    if Path::new(expanded.as_ref()).is_absolute() {
        return Classification::AbsolutePath(PathBuf::from(expanded.as_ref()));
    }
    if exists_locally(reference, base_dir) || plausibly_local(reference) {
        return Classification::RelativePath(PathBuf::from(reference));
    }

    Classification::Fallback(reference.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn globs_win_over_everything() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            classify("alice/*.mdc", dir.path()),
            Classification::Glob("alice/*.mdc".to_string())
        );
        assert_eq!(
            classify("rules/**/f.mdc", dir.path()),
            Classification::Glob("rules/**/f.mdc".to_string())
        );
    }

    #[test]
    fn blob_and_tree_urls_parse_coordinates() {
        let dir = TempDir::new().unwrap();
        let blob = classify(
            "https://github.com/alice/repo/blob/main/rules/foo.mdc",
            dir.path(),
        );
        assert_eq!(
            blob,
            Classification::ForgeBlobUrl(BlobRef {
                owner: "alice".to_string(),
                repo: "repo".to_string(),
                git_ref: "main".to_string(),
                path: "rules/foo.mdc".to_string(),
            })
        );
        assert!(matches!(
            classify("https://github.com/alice/repo/tree/main/rules", dir.path()),
            Classification::ForgeTreeUrl(_)
        ));
    }

    #[test]
    fn pinned_forms_win_over_plain_shorthand() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            classify("alice/foo:abc1234", dir.path()),
            Classification::ShorthandCommit {
                user: "alice".to_string(),
                rule: "foo".to_string(),
                sha: "abc1234".to_string(),
            }
        );
        assert_eq!(
            classify("alice/foo@v1.2.0", dir.path()),
            Classification::ShorthandTag {
                user: "alice".to_string(),
                rule: "foo".to_string(),
                tag: "v1.2.0".to_string(),
            }
        );
    }

    #[test]
    fn shorthand_path_carries_suffix_and_strips_mdc() {
        let dir = TempDir::new().unwrap();
        match classify("alice/frontend/react:abcd12", dir.path()) {
            Classification::ShorthandPath {
                user,
                segments,
                suffix,
            } => {
                assert_eq!(user, "alice");
                assert_eq!(segments, vec!["frontend", "react"]);
                assert_eq!(suffix, Some(RefSuffix::Commit("abcd12".to_string())));
            }
            other => panic!("unexpected classification: {other:?}"),
        }
        match classify("alice/frontend/react.mdc", dir.path()) {
            Classification::ShorthandPath { segments, .. } => {
                assert_eq!(segments, vec!["frontend", "react"]);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn extension_is_never_a_two_segment_shorthand() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            classify("user/rule.mdc", dir.path()),
            Classification::RelativePath(PathBuf::from("user/rule.mdc"))
        );
    }

    #[test]
    fn existing_local_dir_beats_shorthand_shape() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("alice")).unwrap();
        fs::write(dir.path().join("alice/foo"), b"x").unwrap();
        assert_eq!(
            classify("alice/foo", dir.path()),
            Classification::RelativePath(PathBuf::from("alice/foo"))
        );
    }

    #[test]
    fn plain_shorthand_when_nothing_local_matches() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            classify("alice/foo", dir.path()),
            Classification::Shorthand {
                user: "alice".to_string(),
                rule: "foo".to_string(),
            }
        );
    }

    #[test]
    fn dot_prefixed_strings_are_relative_paths() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            classify("./rules/foo.mdc", dir.path()),
            Classification::RelativePath(_)
        ));
        assert!(matches!(
            classify("../shared/foo.mdc", dir.path()),
            Classification::RelativePath(_)
        ));
    }

    #[test]
    fn absolute_paths_classify_even_when_missing() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            classify("/tmp/definitely/missing.mdc", dir.path()),
            Classification::AbsolutePath(_)
        ));
    }

    #[test]
    fn bare_words_fall_through() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            classify("monorepo", dir.path()),
            Classification::Fallback("monorepo".to_string())
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let a = classify("alice/foo:dead99", dir.path());
        let b = classify("alice/foo:dead99", dir.path());
        assert_eq!(a, b);
    }
}
