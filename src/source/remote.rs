//! Remote contents-API source.
//!
//! Files are fetched with `GET {base_url}/{path}/{file}` using the raw
//! media type; directories return a JSON listing. Every request carries its
//! own timeout. Listings are fetched in sequential batches of concurrent
//! requests so outbound concurrency never exceeds the batch size.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{file_name, is_safe_slug, join_path, ContentSource, SourceKind};
use crate::content::{normalize_slug, ItemMetadata, RawDocument};
use crate::error::{ContentError, Result};

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const USER_AGENT: &str = concat!("contentkit/", env!("CARGO_PKG_VERSION"));

/// Longest upstream body kept in error context
const RESPONSE_SNIPPET_CHARS: usize = 500;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Entry of a directory listing
#[derive(Debug, Deserialize)]
struct ListingEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    sha: Option<String>,
}

/// Fetches content from a hosted repository over HTTP
#[derive(Debug, Clone)]
pub struct RemoteSource {
    base_url: String,
    access_token: String,
    timeout: Duration,
    batch_size: usize,
    batch_delay: Duration,
    client: reqwest::Client,
}

impl RemoteSource {
    /// Create a source with default timeout and batching
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ContentError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timeout: DEFAULT_TIMEOUT,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
            client,
        })
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Concurrent requests per batch and pause between batches
    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        let path = join_path(&[path]);
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Issue a GET with the per-request timeout, returning status and body.
    async fn get(&self, url: &str, accept: &str, path: &str) -> Result<(StatusCode, String)> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
                .header(ACCEPT, accept)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(ContentError::fetch(SourceKind::Github.to_string(), path, 500, e)),
            Err(_) => Err(ContentError::timeout(url, self.timeout)),
        }
    }

    fn upstream_error(status: StatusCode, url: &str, body: &str) -> ContentError {
        let snippet: String = body.chars().take(RESPONSE_SNIPPET_CHARS).collect();
        ContentError::remote_api(
            status.as_u16(),
            url,
            (!snippet.is_empty()).then_some(snippet),
        )
    }

    /// Fetch a listed document, addressed like [`ContentSource::fetch_raw`]
    async fn fetch_document(&self, dir: &str, item: &ItemMetadata) -> Result<RawDocument> {
        let file_path = join_path(&[dir, item.name.as_str()]);
        let url = self.url(&file_path);
        let (status, body) = self.get(&url, RAW_MEDIA_TYPE, &file_path).await?;

        if status == StatusCode::OK {
            Ok(RawDocument {
                name: item.name.clone(),
                path: file_path,
                text: body,
            })
        } else {
            Err(Self::upstream_error(status, &url, &body))
        }
    }
}

#[async_trait]
impl ContentSource for RemoteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Github
    }

    async fn fetch_raw(&self, path: &str, slug: &str) -> Result<Option<RawDocument>> {
        if !is_safe_slug(slug) {
            debug!("Rejected unsafe slug '{}'", slug);
            return Ok(None);
        }

        let name = file_name(slug);
        let file_path = join_path(&[path, name.as_str()]);
        let url = self.url(&file_path);

        let (status, body) = self.get(&url, RAW_MEDIA_TYPE, &file_path).await?;
        match status {
            StatusCode::OK => Ok(Some(RawDocument {
                name,
                path: file_path,
                text: body,
            })),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::upstream_error(status, &url, &body)),
        }
    }

    async fn fetch_metadata(&self, path: &str) -> Result<Vec<ItemMetadata>> {
        let url = self.url(path);
        let (status, body) = self.get(&url, JSON_MEDIA_TYPE, path).await?;

        match status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(ContentError::fetch(
                    SourceKind::Github.to_string(),
                    path,
                    404,
                    "directory not found",
                ));
            }
            _ => return Err(Self::upstream_error(status, &url, &body)),
        }

        let entries: Vec<ListingEntry> = serde_json::from_str(&body).map_err(|e| {
            ContentError::fetch(
                SourceKind::Github.to_string(),
                path,
                502,
                format!("expected a directory listing: {e}"),
            )
        })?;

        let mut items: Vec<ItemMetadata> = entries
            .into_iter()
            .filter(|entry| entry.kind == "file" && entry.name.ends_with(".md"))
            .map(|entry| ItemMetadata {
                slug: normalize_slug(&entry.name),
                path: join_path(&[path, entry.name.as_str()]),
                name: entry.name,
                size: entry.size,
                sha: entry.sha,
            })
            .collect();

        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn fetch_raw_many(&self, path: &str) -> Result<Vec<RawDocument>> {
        let items = self.fetch_metadata(path).await?;
        let batch_count = items.len().div_ceil(self.batch_size);
        info!(
            "Fetching {} documents from {} in {} batches",
            items.len(),
            path,
            batch_count
        );

        let mut documents = Vec::with_capacity(items.len());
        for (index, batch) in items.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let results = join_all(batch.iter().map(|item| self.fetch_document(path, item))).await;
            for result in results {
                match result {
                    Ok(document) => documents.push(document),
                    Err(e) => {
                        error!("Batch {} of {} aborted: {}", index + 1, path, e);
                        return Err(e);
                    }
                }
            }
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let source = RemoteSource::new("https://api.example.com/repos/acme/site/contents/", "t").unwrap();
        assert_eq!(
            source.url("stories/en/a.md"),
            "https://api.example.com/repos/acme/site/contents/stories/en/a.md"
        );
        assert_eq!(source.url(""), "https://api.example.com/repos/acme/site/contents");
    }

    #[test]
    fn test_batch_size_is_at_least_one() {
        let source = RemoteSource::new("http://localhost", "t")
            .unwrap()
            .with_batching(0, Duration::ZERO);
        assert_eq!(source.batch_size, 1);
    }

    #[test]
    fn test_listing_entry_decoding() {
        let body = r#"[{"name":"a.md","path":"blog/en/a.md","type":"file","size":12,"sha":"abc"},
                       {"name":"img","path":"blog/en/img","type":"dir"}]"#;
        let entries: Vec<ListingEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, "dir");
        assert_eq!(entries[1].size, 0);
    }
}
