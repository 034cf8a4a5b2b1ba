//! SHA-256 checksum helpers for install-time recording and local-edit
//! detection.
//!
//! The lockfile stores bare lowercase 64-hex digests. Checksums are taken
//! over exact file bytes, so line endings and frontmatter are significant.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Hex SHA-256 of a byte slice.
#[must_use]
pub fn checksum_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of a file's contents.
pub fn checksum_file(path: &Path) -> Result<String> {
    let content = fs::read(path).with_context(|| {
        format!(
            "Cannot read file for checksum calculation: {}",
            path.display()
        )
    })?;
    Ok(checksum_bytes(&content))
}

/// Combined hex SHA-256 over several files, concatenated in order.
///
/// Used for records whose authoritative content spans multiple artifacts.
pub fn checksum_files(paths: &[&Path]) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        let content = fs::read(path).with_context(|| {
            format!(
                "Cannot read file for checksum calculation: {}",
                path.display()
            )
        })?;
        hasher.update(&content);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bytes_and_file_checksums_agree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rule.mdc");
        fs::write(&path, b"# hello").unwrap();
        assert_eq!(checksum_file(&path).unwrap(), checksum_bytes(b"# hello"));
    }

    #[test]
    fn checksum_is_bare_lowercase_hex() {
        let sum = checksum_bytes(b"x");
        assert_eq!(sum.len(), 64);
        assert!(sum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn multi_file_checksum_matches_concatenation() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.mdc");
        let b = dir.path().join("b.mdc");
        fs::write(&a, b"aa").unwrap();
        fs::write(&b, b"bb").unwrap();
        assert_eq!(
            checksum_files(&[&a, &b]).unwrap(),
            checksum_bytes(b"aabb")
        );
    }
}
