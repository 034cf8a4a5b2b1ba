//! Global constants used throughout the cursor-rules codebase.
//!
//! Forge endpoints, well-known file names, and retry parameters live here
//! so each string is defined exactly once.

use std::time::Duration;

/// Hostname of the supported Git forge.
pub const FORGE_HOST: &str = "github.com";

/// Hostname serving raw file content for the forge.
pub const FORGE_RAW_HOST: &str = "raw.githubusercontent.com";

/// API hostname for branch metadata and tree listings.
pub const FORGE_API_HOST: &str = "api.github.com";

/// Name of the per-user collection repository that shorthand references
/// resolve against (`user/rule` -> `user/cursor-rules-collection`).
pub const COLLECTION_REPO: &str = "cursor-rules-collection";

/// Default branch used when a reference carries no explicit ref.
pub const DEFAULT_BRANCH: &str = "main";

/// File name of the lockfile, in both of its candidate locations.
pub const LOCKFILE_NAME: &str = "cursor-rules.lock";

/// Extension carried by every installed rule artifact.
pub const RULE_EXTENSION: &str = "mdc";

/// Rules directory relative to a project root.
pub const RULES_DIR_RELATIVE: &str = ".cursor/rules";

/// Current (and only) supported share manifest format version.
pub const SHARE_FORMAT_VERSION: u32 = 1;

/// Number of attempts for transient forge failures (first try included).
pub const FORGE_RETRY_ATTEMPTS: usize = 3;

/// Starting delay for exponential backoff between forge retries.
pub const FORGE_RETRY_BASE_DELAY_MS: u64 = 250;

/// Timeout applied to every forge HTTP request.
pub const FORGE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Length of a full commit identifier. Only this form is treated as a
/// commit outside the shorthand `:<hex>` parser; shorter hex runs are
/// commit-equivalent only there.
pub const FULL_COMMIT_LEN: usize = 40;

/// Hex digits of the dirname hash mixed into keys for absolute paths.
pub const ABS_KEY_HASH_LEN: usize = 8;
