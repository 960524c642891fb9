//! Artifact download.

use std::path::Path;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::error::{AcquireError, AcquireResult};

/// Default timeout for a whole artifact download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Fetches an artifact to a local file.
///
/// Abstracted so acquisition can be tested without network access.
pub trait ArtifactDownloader: Send + Sync {
    /// Download `url` into `dest`, overwriting it. Returns the byte count.
    fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, AcquireResult<u64>>;
}

/// [`ArtifactDownloader`] that streams an HTTP response to disk.
#[derive(Clone)]
pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_DOWNLOAD_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("nodeward/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");
        Self { http }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactDownloader for HttpDownloader {
    fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> BoxFuture<'a, AcquireResult<u64>> {
        Box::pin(async move {
            let failed = |reason: String| AcquireError::DownloadFailed {
                url: url.to_string(),
                reason,
            };

            let mut response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| failed(e.to_string()))?;

            if !response.status().is_success() {
                return Err(failed(format!("HTTP {}", response.status())));
            }

            let mut file = tokio::fs::File::create(dest).await?;
            let mut written = 0u64;
            while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await?;

            debug!(url, bytes = written, "Artifact downloaded");
            Ok(written)
        })
    }
}
