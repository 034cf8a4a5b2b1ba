//! Cross-platform utilities shared by the rest of the crate.

pub mod fs;

/// Normalize a path for storage in the lockfile: forward slashes on every
/// platform so lockfiles stay portable.
#[must_use]
pub fn normalize_path_for_storage(path: &std::path::Path) -> String {
    let raw = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        raw.into_owned()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    }
}
