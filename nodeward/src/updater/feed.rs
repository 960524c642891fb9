//! Remote release feed.
//!
//! The feed answers two questions: what is the latest release tag, and which
//! commit does a tag point at. [`GithubReleaseFeed`] talks to a GitHub-style
//! REST API; tests substitute their own [`ReleaseFeed`].

use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::error::{UpdateError, UpdateResult};

/// Default HTTP timeout for feed and listing requests.
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(30);

/// Release APIs reject requests without a User-Agent.
const USER_AGENT: &str = concat!("nodeward/", env!("CARGO_PKG_VERSION"));

/// Source of release metadata for one client.
pub trait ReleaseFeed: Send + Sync {
    /// Tag text of the latest release, e.g. `v1.5.1`.
    fn latest_tag(&self) -> BoxFuture<'_, UpdateResult<String>>;

    /// Full commit id the given tag points at.
    fn commit_for_tag<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, UpdateResult<String>>;
}

/// Endpoints used by the HTTP feed and listing sources.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Latest-release endpoint, returning `{"tag_name": ...}`.
    pub release_url: String,
    /// Commit endpoint with a `{tag}` placeholder, returning `{"sha": ...}`.
    pub commit_url: String,
    /// Object-storage listing of release assets.
    pub listing_url: String,
    pub timeout: Duration,
}

#[derive(Deserialize)]
struct LatestRelease {
    tag_name: String,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

/// [`ReleaseFeed`] backed by a GitHub-compatible REST API.
pub struct GithubReleaseFeed {
    http: reqwest::Client,
    release_url: String,
    commit_url: String,
}

impl GithubReleaseFeed {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            http: build_http_client(config.timeout),
            release_url: config.release_url.clone(),
            commit_url: config.commit_url.clone(),
        }
    }

    fn commit_url_for(&self, tag: &str) -> String {
        self.commit_url.replace("{tag}", tag)
    }
}

impl ReleaseFeed for GithubReleaseFeed {
    fn latest_tag(&self) -> BoxFuture<'_, UpdateResult<String>> {
        Box::pin(async move {
            let release: LatestRelease = fetch_json(&self.http, &self.release_url).await?;
            debug!(tag = %release.tag_name, "Fetched latest release tag");
            Ok(release.tag_name)
        })
    }

    fn commit_for_tag<'a>(&'a self, tag: &'a str) -> BoxFuture<'a, UpdateResult<String>> {
        Box::pin(async move {
            let url = self.commit_url_for(tag);
            let commit: CommitRef = fetch_json(&self.http, &url).await?;
            debug!(tag, sha = %commit.sha, "Fetched commit for tag");
            Ok(commit.sha)
        })
    }
}

impl std::fmt::Debug for GithubReleaseFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubReleaseFeed")
            .field("release_url", &self.release_url)
            .field("commit_url", &self.commit_url)
            .finish()
    }
}

pub(super) fn build_http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client")
}

/// GET `url` and return the body, mapping every failure to `Network`.
pub(super) async fn fetch_bytes(http: &reqwest::Client, url: &str) -> UpdateResult<Vec<u8>> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| UpdateError::network(url, e))?;

    if !response.status().is_success() {
        return Err(UpdateError::network(
            url,
            format!("HTTP {}", response.status()),
        ));
    }

    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| UpdateError::network(url, e))
}

/// GET `url` and decode the JSON body, mapping decode failures to `Parse`.
pub(super) async fn fetch_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
) -> UpdateResult<T> {
    let bytes = fetch_bytes(http, url).await?;
    serde_json::from_slice(&bytes).map_err(|e| UpdateError::parse(url, e))
}
