use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_articles, Article, ParseOptions, DEFAULT_MAX_ENTRIES};
use super::extract::DEFAULT_PLACEHOLDER_IMAGE;
use crate::config::Config;
use crate::storage::FeedSource;

/// Wall-clock limit for one feed download, request through last body byte.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching or parsing one feed.
///
/// The fetcher never returns these to the aggregation caller; they are
/// recorded on [`FeedFetch::error`] for diagnostics.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, invalid URL, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Fetch exceeded its wall-clock budget
    #[error("Request timed out")]
    Timeout,
    /// Document could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Outcome of fetching one feed source.
///
/// `articles` is empty both when the feed had no entries and when the fetch
/// failed; `error` tells the two apart.
#[derive(Debug)]
pub struct FeedFetch {
    pub source_id: String,
    pub source_name: String,
    pub articles: Vec<Article>,
    pub error: Option<FetchError>,
}

impl FeedFetch {
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Fetches one feed source into normalized articles.
///
/// Implementations must absorb every failure into [`FeedFetch::error`] so one
/// bad source can never abort an aggregation.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> FeedFetch;
}

/// HTTP-backed [`SourceFetcher`].
///
/// Holds a `reqwest::Client` (cheap to clone, shares its connection pool).
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_entries: usize,
    placeholder_image: String,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_entries: DEFAULT_MAX_ENTRIES,
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            timeout: config.fetch_timeout(),
            max_entries: config.max_entries_per_feed,
            placeholder_image: config.placeholder_image.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn try_fetch(&self, source: &FeedSource) -> Result<Vec<Article>, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, download(&self.client, &source.url))
            .await
            .map_err(|_| FetchError::Timeout)??;

        let opts = ParseOptions {
            source_name: &source.name,
            max_entries: self.max_entries,
            placeholder_image: &self.placeholder_image,
            now: chrono::Utc::now().timestamp(),
        };

        parse_articles(&bytes, &opts).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SourceFetcher for FeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> FeedFetch {
        let (articles, error) = match self.try_fetch(source).await {
            Ok(articles) => {
                tracing::debug!(
                    feed = %source.url,
                    name = %source.name,
                    articles = articles.len(),
                    "Feed fetched"
                );
                (articles, None)
            }
            Err(e) => {
                tracing::warn!(
                    feed = %source.url,
                    name = %source.name,
                    error = %e,
                    "Feed fetch failed, skipping source"
                );
                (Vec::new(), Some(e))
            }
        };

        FeedFetch {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            articles,
            error,
        }
    }
}

async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, MAX_FEED_SIZE).await
}

/// Reads a response body, refusing anything over `limit` bytes.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
