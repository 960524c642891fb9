//! Object-storage listing of release assets and their checksums.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::BoxFuture;
use serde::Deserialize;

use super::error::{UpdateError, UpdateResult};
use super::feed::{build_http_client, fetch_bytes, FeedConfig};

/// Asset name → lowercase hex checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumListing {
    entries: BTreeMap<String, String>,
}

/// `<EnumerationResults>` root of a container listing.
#[derive(Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: Blobs,
}

#[derive(Deserialize, Default)]
struct Blobs {
    #[serde(rename = "Blob", default)]
    blob: Vec<Blob>,
}

#[derive(Deserialize)]
struct Blob {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Properties", default)]
    properties: BlobProperties,
}

#[derive(Deserialize, Default)]
struct BlobProperties {
    /// Base64 of the raw MD5 digest.
    #[serde(rename = "Content-MD5", default)]
    content_md5: Option<String>,
}

impl ChecksumListing {
    /// Parse an object-storage container listing:
    /// `EnumerationResults/Blobs/Blob/{Name, Properties/Content-MD5}`.
    ///
    /// Blobs without a hash are skipped; a hash that is not valid base64
    /// fails the whole listing.
    pub fn parse(source_name: &str, content: &[u8]) -> UpdateResult<Self> {
        let text = std::str::from_utf8(content).map_err(|e| UpdateError::parse(source_name, e))?;
        let doc: EnumerationResults = quick_xml::de::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| UpdateError::parse(source_name, e))?;

        let mut entries = BTreeMap::new();
        for blob in doc.blobs.blob {
            let Some(encoded) = blob.properties.content_md5 else {
                continue;
            };
            let encoded = encoded.trim();
            if encoded.is_empty() {
                continue;
            }
            let digest = STANDARD.decode(encoded).map_err(|e| {
                UpdateError::parse(source_name, format!("blob '{}': {}", blob.name, e))
            })?;
            entries.insert(blob.name, hex::encode(digest));
        }
        Ok(Self { entries })
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Checksum for the asset with exactly this name.
    pub fn get(&self, asset: &str) -> Option<&str> {
        self.entries.get(asset).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Source of the checksum listing.
pub trait ChecksumListingSource: Send + Sync {
    fn fetch_listing(&self) -> BoxFuture<'_, UpdateResult<ChecksumListing>>;
}

/// [`ChecksumListingSource`] that GETs a container listing over HTTP.
pub struct HttpListingSource {
    http: reqwest::Client,
    url: String,
}

impl HttpListingSource {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            http: build_http_client(config.timeout),
            url: config.listing_url.clone(),
        }
    }
}

impl ChecksumListingSource for HttpListingSource {
    fn fetch_listing(&self) -> BoxFuture<'_, UpdateResult<ChecksumListing>> {
        Box::pin(async move {
            if self.url.is_empty() {
                return Err(UpdateError::network("listing", "no listing_url configured"));
            }
            let body = fetch_bytes(&self.http, &self.url).await?;
            let listing = ChecksumListing::parse(&self.url, &body)?;
            tracing::debug!(url = %self.url, assets = listing.len(), "Fetched checksum listing");
            Ok(listing)
        })
    }
}
