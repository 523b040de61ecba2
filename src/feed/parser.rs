use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use serde::Serialize;

use super::extract::{extract_image_with_media, extract_summary};
use super::media::image_media_by_entry;
use crate::util::strip_control_chars;

/// Entries considered per feed, in document order.
pub const DEFAULT_MAX_ENTRIES: usize = 12;

/// `published` display value for entries without a date.
pub const UNDATED_LABEL: &str = "Recent";

/// One normalized, display-ready item derived from a feed entry.
///
/// Produced fresh on every aggregation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub thumbnail: String,
    pub summary: String,
    /// Name of the feed source the article came from
    pub source: String,
    /// Human-readable publish date, or `"Recent"`
    pub published: String,
    /// Unix seconds; "now" at fetch time when the entry is undated
    pub timestamp: i64,
}

/// Options that shape how entries become articles.
#[derive(Debug, Clone)]
pub struct ParseOptions<'a> {
    pub source_name: &'a str,
    pub max_entries: usize,
    pub placeholder_image: &'a str,
    /// Timestamp given to undated entries
    pub now: i64,
}

/// Parses RSS/Atom/JSON Feed bytes into at most `opts.max_entries` articles.
pub fn parse_articles(
    bytes: &[u8],
    opts: &ParseOptions<'_>,
) -> Result<Vec<Article>, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;
    let media = image_media_by_entry(bytes);

    let articles = feed
        .entries
        .iter()
        .enumerate()
        .take(opts.max_entries)
        .map(|(idx, entry)| {
            let media_image = media.get(idx).and_then(|m| m.as_deref());
            to_article(entry, media_image, opts)
        })
        .collect();

    Ok(articles)
}

/// Normalizes one entry; image and summary come from the extractor.
///
/// Only the entry's publish date counts; an entry that merely carries an
/// update date is treated as undated.
pub fn to_article(entry: &Entry, media_image: Option<&str>, opts: &ParseOptions<'_>) -> Article {
    let title = entry
        .title
        .as_ref()
        .map(|t| strip_control_chars(t.content.trim()).into_owned())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let date: Option<DateTime<Utc>> = entry.published;

    Article {
        title,
        link,
        thumbnail: extract_image_with_media(entry, media_image).into_url(opts.placeholder_image),
        summary: extract_summary(entry).into_text(),
        source: opts.source_name.to_owned(),
        published: date
            .map(|d| d.to_rfc2822())
            .unwrap_or_else(|| UNDATED_LABEL.to_string()),
        timestamp: date.map(|d| d.timestamp()).unwrap_or(opts.now),
    }
}
