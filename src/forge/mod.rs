//! The forge capability: raw file access and branch metadata for a hosted
//! Git service.
//!
//! The core only ever talks to [`ForgeClient`]; the production
//! implementation ([`http::HttpForgeClient`]) speaks HTTP to
//! github.com-compatible endpoints, and tests substitute an in-memory
//! mock. The trait returns boxed futures so it stays dyn-compatible while
//! the methods remain async.
//!
//! Errors are typed as [`FetchError`] so callers can react to the shape of
//! a failure (404 drives shorthand fallbacks, rate limits surface as their
//! own user-facing error kind) without inspecting message text.

pub mod http;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::constants::FORGE_RAW_HOST;
use crate::core::CancellationToken;

/// Errors produced by forge fetches.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The file, branch, or tree does not exist (HTTP 404).
    #[error("not found: {url}")]
    NotFound {
        /// URL that returned 404
        url: String,
    },

    /// The forge rejected the request due to rate limiting.
    #[error("rate limited by the forge")]
    RateLimited {
        /// Reset time as reported by the forge, when available
        reset: Option<String>,
    },

    /// Any other HTTP error status.
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Transport-level failure (DNS, connect, timeout).
    #[error("network error fetching {url}: {message}")]
    Network {
        /// Requested URL
        url: String,
        /// Transport error description
        message: String,
    },

    /// The response body was not in the expected shape.
    #[error("unexpected response from {url}: {message}")]
    Malformed {
        /// Requested URL
        url: String,
        /// What was wrong
        message: String,
    },

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether retrying the same request may succeed (5xx and transport
    /// failures; never 4xx).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// What the core requires from a forge.
///
/// Implementations must honor the cancellation token before and during
/// network work and must surface rate limiting as
/// [`FetchError::RateLimited`].
pub trait ForgeClient: Send + Sync {
    /// Download the raw bytes of a file at a ref.
    fn fetch_raw(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<u8>, FetchError>>;

    /// Resolve the current head commit of a branch (full 40-hex).
    fn head_commit(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<String, FetchError>>;

    /// List file paths at a ref that match a glob pattern.
    ///
    /// Recurses into subdirectories iff the pattern demands it (`**` or an
    /// embedded `/`).
    fn list_tree(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<String>, FetchError>>;
}

/// The raw-content URL for a file, used for fetching and for reporting
/// attempted locations in not-found errors.
#[must_use]
pub fn raw_url(owner: &str, repo: &str, git_ref: &str, path: &str) -> String {
    format!("https://{FORGE_RAW_HOST}/{owner}/{repo}/{git_ref}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_url_joins_coordinates() {
        assert_eq!(
            raw_url("alice", "cursor-rules-collection", "main", "foo.mdc"),
            "https://raw.githubusercontent.com/alice/cursor-rules-collection/main/foo.mdc"
        );
    }

    #[test]
    fn transience_is_status_driven() {
        assert!(
            FetchError::Status {
                status: 502,
                url: String::new()
            }
            .is_transient()
        );
        assert!(
            !FetchError::Status {
                status: 404,
                url: String::new()
            }
            .is_transient()
        );
        assert!(
            !FetchError::NotFound {
                url: String::new()
            }
            .is_transient()
        );
        assert!(!FetchError::RateLimited { reset: None }.is_transient());
    }
}
