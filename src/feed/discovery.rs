use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::fetcher::{read_limited_bytes, FetchError};
use crate::config::Config;

/// Request timeout for fetching the page to scan.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum candidates returned by one discovery.
pub const MAX_DISCOVERY_RESULTS: usize = 20;

const MAX_DISCOVERY_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// `type` values of `<link>` elements that declare a feed.
const FEED_LINK_TYPES: [&str; 2] = ["application/rss+xml", "application/atom+xml"];

/// Substrings that make an anchor's href look like a feed.
const ANCHOR_HINTS: [&str; 3] = ["rss", "feed", ".xml"];

const DEFAULT_LINK_TITLE: &str = "RSS Feed";
const DEFAULT_ANCHOR_TITLE: &str = "Feed";

/// A URL that probably serves a feed, found on a web page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFeed {
    pub title: String,
    /// Absolute URL, unique within one [`Discovery`]
    pub url: String,
}

/// Advisory failure states of a discovery. `Display` gives the exact
/// user-facing message.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The page could not be fetched at all
    #[error("Could not connect.")]
    CouldNotConnect(#[source] FetchError),
    /// The page was fetched but nothing on it looks like a feed
    #[error("No RSS feeds found.")]
    NoFeedsFound,
}

/// Outcome of one discovery: candidates, or an advisory error when empty.
#[derive(Debug)]
pub struct Discovery {
    /// The normalized URL that was requested
    pub url: String,
    pub candidates: Vec<DiscoveredFeed>,
    pub error: Option<DiscoveryError>,
}

/// Best-effort scanner for feed links on an arbitrary page.
///
/// Declared `<link type="application/rss+xml|atom+xml">` elements come first;
/// anchors whose href mentions `rss`, `feed` or `.xml` fill the remainder.
/// False positives from the anchor heuristic are expected.
#[derive(Debug, Clone)]
pub struct Discoverer {
    client: reqwest::Client,
    timeout: Duration,
}

impl Discoverer {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_DISCOVERY_TIMEOUT,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            timeout: config.discovery_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetches `raw_url` and collects feed candidates from it.
    ///
    /// A missing scheme is replaced with `https://`. Never fails outright:
    /// an unreachable page yields [`DiscoveryError::CouldNotConnect`], a page
    /// without candidates [`DiscoveryError::NoFeedsFound`].
    pub async fn discover(&self, raw_url: &str) -> Discovery {
        let url = normalize_site_url(raw_url);

        let (page_url, body) = match self.fetch_page(&url).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Discovery fetch failed");
                return Discovery {
                    url,
                    candidates: Vec::new(),
                    error: Some(DiscoveryError::CouldNotConnect(e)),
                };
            }
        };

        let html = String::from_utf8_lossy(&body);
        let candidates = find_feed_candidates(&html, &page_url);
        tracing::debug!(url = %url, found = candidates.len(), "Discovery complete");

        let error = candidates.is_empty().then_some(DiscoveryError::NoFeedsFound);
        Discovery {
            url,
            candidates,
            error,
        }
    }

    /// Returns the final URL (after redirects) and the body. Error statuses
    /// still return their body; only failing to get one at all is an error.
    async fn fetch_page(&self, url: &str) -> Result<(Url, Vec<u8>), FetchError> {
        tokio::time::timeout(self.timeout, async {
            let response = self.client.get(url).send().await?;
            let final_url = response.url().clone();
            if !response.status().is_success() {
                tracing::debug!(url = %url, status = %response.status(), "Scanning error page");
            }
            let body = read_limited_bytes(response, MAX_DISCOVERY_SIZE).await?;
            Ok::<_, FetchError>((final_url, body))
        })
        .await
        .map_err(|_| FetchError::Timeout)?
    }
}

/// Prepends `https://` unless the input already starts with an http(s) scheme.
pub fn normalize_site_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

/// Scans HTML for feed candidates, resolved against `base`.
///
/// Deduplicated by URL in first-seen order and capped at
/// [`MAX_DISCOVERY_RESULTS`].
pub fn find_feed_candidates(html: &str, base: &Url) -> Vec<DiscoveredFeed> {
    let document = Html::parse_document(html);
    let mut found = Vec::new();

    for link in document.select(link_selector()) {
        let el = link.value();
        let declares_feed = el.attr("type").is_some_and(|t| {
            let t = t.trim();
            FEED_LINK_TYPES.iter().any(|ft| t.eq_ignore_ascii_case(ft))
        });
        if !declares_feed {
            continue;
        }
        let Some(url) = el.attr("href").and_then(|href| resolve_href(base, href)) else {
            continue;
        };
        let title = el
            .attr("title")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_LINK_TITLE);
        found.push(DiscoveredFeed {
            title: title.to_owned(),
            url,
        });
    }

    if found.len() < MAX_DISCOVERY_RESULTS {
        for anchor in document.select(anchor_selector()) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href_lower = href.to_lowercase();
            if !ANCHOR_HINTS.iter().any(|hint| href_lower.contains(hint)) {
                continue;
            }
            let Some(url) = resolve_href(base, href) else {
                continue;
            };
            found.push(DiscoveredFeed {
                title: anchor_title(&anchor),
                url,
            });
        }
    }

    dedupe_candidates(found, MAX_DISCOVERY_RESULTS)
}

fn anchor_title(anchor: &ElementRef<'_>) -> String {
    let text: String = anchor.text().collect();
    let text = text.trim();
    if text.is_empty() {
        DEFAULT_ANCHOR_TITLE.to_owned()
    } else {
        text.to_owned()
    }
}

/// Keeps the first candidate per URL, preserving order, up to `limit`.
fn dedupe_candidates(candidates: Vec<DiscoveredFeed>, limit: usize) -> Vec<DiscoveredFeed> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .take(limit)
        .collect()
}

/// Resolves `href` against `base`; only http(s) results are kept.
fn resolve_href(base: &Url, href: &str) -> Option<String> {
    let resolved = base.join(href.trim()).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn link_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("link[type]").expect("static selector is valid"))
}

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").expect("static selector is valid"))
}
