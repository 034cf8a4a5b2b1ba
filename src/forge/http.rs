//! HTTP implementation of [`ForgeClient`] for github.com-compatible
//! forges.
//!
//! Raw content comes from the raw host, branch heads and tree listings
//! from the REST API. Transient failures (5xx, transport errors) are
//! retried with jittered exponential backoff; 4xx responses are never
//! retried. No authentication is sent; private repositories are out of
//! scope.

use futures::future::BoxFuture;
use glob::Pattern;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

use super::{FetchError, ForgeClient, raw_url};
use crate::constants::{
    FORGE_API_HOST, FORGE_REQUEST_TIMEOUT, FORGE_RETRY_ATTEMPTS, FORGE_RETRY_BASE_DELAY_MS,
};
use crate::core::CancellationToken;

#[derive(Deserialize)]
struct BranchResponse {
    commit: BranchCommit,
}

#[derive(Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
}

#[derive(Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Forge client speaking HTTP to github.com-compatible hosts.
#[derive(Debug, Clone)]
pub struct HttpForgeClient {
    client: reqwest::Client,
}

impl HttpForgeClient {
    /// Build a client with the standard timeout and user agent.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(FORGE_REQUEST_TIMEOUT)
            .user_agent(concat!("cursor-rules-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    fn retry_strategy() -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(FORGE_RETRY_BASE_DELAY_MS)
            .map(jitter)
            .take(FORGE_RETRY_ATTEMPTS - 1)
    }

    /// GET a URL, translating status codes into [`FetchError`] kinds.
    async fn get(
        client: reqwest::Client,
        url: String,
        cancel: CancellationToken,
    ) -> Result<reqwest::Response, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let response = client.get(&url).send().await.map_err(|e| {
            FetchError::Network {
                url: url.clone(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound { url });
        }
        if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limited(&response) {
            let reset = response
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            return Err(FetchError::RateLimited { reset });
        }
        Err(FetchError::Status {
            status: status.as_u16(),
            url,
        })
    }

    async fn get_with_retry(
        client: reqwest::Client,
        url: String,
        cancel: CancellationToken,
    ) -> Result<reqwest::Response, FetchError> {
        RetryIf::spawn(
            Self::retry_strategy(),
            || {
                let client = client.clone();
                let url = url.clone();
                let cancel = cancel.clone();
                async move {
                    let result = Self::get(client, url, cancel).await;
                    if let Err(e) = &result {
                        if e.is_transient() {
                            warn!(error = %e, "transient forge failure, will retry");
                        }
                    }
                    result
                }
            },
            FetchError::is_transient,
        )
        .await
    }
}

fn is_rate_limited(response: &reqwest::Response) -> bool {
    response.status() == StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0")
}

/// Whether a tree listing must recurse to satisfy a pattern.
fn pattern_needs_recursion(pattern: &str) -> bool {
    pattern.contains("**") || pattern.contains('/')
}

impl ForgeClient for HttpForgeClient {
    fn fetch_raw(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        path: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let url = raw_url(owner, repo, git_ref, path);
        let client = self.client.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            debug!(url = %url, "fetching raw content");
            let response = Self::get_with_retry(client, url.clone(), cancel).await?;
            let bytes = response.bytes().await.map_err(|e| FetchError::Network {
                url,
                message: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        })
    }

    fn head_commit(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<String, FetchError>> {
        let url = format!("https://{FORGE_API_HOST}/repos/{owner}/{repo}/branches/{branch}");
        let client = self.client.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            debug!(url = %url, "resolving branch head");
            let response = Self::get_with_retry(client, url.clone(), cancel).await?;
            let parsed: BranchResponse =
                response.json().await.map_err(|e| FetchError::Malformed {
                    url,
                    message: e.to_string(),
                })?;
            Ok(parsed.commit.sha)
        })
    }

    fn list_tree(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
        pattern: &str,
        cancel: &CancellationToken,
    ) -> BoxFuture<'static, Result<Vec<String>, FetchError>> {
        let recursive = pattern_needs_recursion(pattern);
        let mut url =
            format!("https://{FORGE_API_HOST}/repos/{owner}/{repo}/git/trees/{git_ref}");
        if recursive {
            url.push_str("?recursive=1");
        }
        let pattern = pattern.to_string();
        let client = self.client.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            debug!(url = %url, pattern = %pattern, "listing tree");
            let matcher = Pattern::new(&pattern).map_err(|e| FetchError::Malformed {
                url: url.clone(),
                message: format!("invalid glob pattern: {e}"),
            })?;
            let response = Self::get_with_retry(client, url.clone(), cancel).await?;
            let parsed: TreeResponse =
                response.json().await.map_err(|e| FetchError::Malformed {
                    url,
                    message: e.to_string(),
                })?;
            let mut paths: Vec<String> = parsed
                .tree
                .into_iter()
                .filter(|entry| entry.kind == "blob")
                .map(|entry| entry.path)
                .filter(|path| matcher.matches(path))
                .collect();
            paths.sort();
            Ok(paths)
        })
    }
}
