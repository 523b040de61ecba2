//! Thumbnail and summary derivation for a single feed entry.
//!
//! Both extractors are total: malformed media fields or markup degrade to a
//! fallback value, reported through the returned enum so callers (and tests)
//! can tell "nothing there" apart from "something went wrong".

use feed_rs::model::Entry;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use thiserror::Error;

use crate::util::{collapse_whitespace, strip_control_chars, truncate_chars, ELLIPSIS};

/// Thumbnail used when an entry carries no usable image.
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "https://picsum.photos/400/225";

/// Plaintext characters kept in a summary before the ellipsis.
pub const SUMMARY_MAX_CHARS: usize = 150;

/// Summary shown when markup could not be reduced to text.
pub const SUMMARY_FALLBACK: &str = "Click to read more...";

/// Markup above this size is not handed to the HTML parser.
const MAX_MARKUP_SIZE: usize = 1024 * 1024; // 1MB

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("markup too large to extract ({0} bytes)")]
    MarkupTooLarge(usize),
}

/// Where an entry's thumbnail came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Declared `media:thumbnail`
    Thumbnail(String),
    /// First declared media content with an image MIME type
    MediaContent(String),
    /// First `<img src>` in the entry's HTML body
    Embedded(String),
    Placeholder,
}

impl ImageSource {
    /// Resolves to a URL, substituting `placeholder` when nothing was found.
    pub fn into_url(self, placeholder: &str) -> String {
        match self {
            Self::Thumbnail(url) | Self::MediaContent(url) | Self::Embedded(url) => url,
            Self::Placeholder => placeholder.to_owned(),
        }
    }
}

/// Result of reducing an entry's summary/content to display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Truncated plaintext with the ellipsis appended
    Text(String),
    /// The entry had neither a summary nor a content body
    Absent,
    /// Markup existed but could not be reduced to text
    Fallback(ExtractError),
}

impl SummaryOutcome {
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Absent => String::new(),
            Self::Fallback(_) => SUMMARY_FALLBACK.to_owned(),
        }
    }
}

/// Picks a thumbnail for `entry`.
///
/// Resolution order, first match wins: media thumbnail, media content whose
/// type mentions `image`, first `<img>` in the body, placeholder.
pub fn extract_image(entry: &Entry) -> ImageSource {
    extract_image_with_media(entry, None)
}

/// Like [`extract_image`], with `media_image` taken from the entry's
/// `media:content` elements by [`super::media::image_media_by_entry`].
///
/// `media_image` covers media content tagged `medium="image"`, which the
/// parsed entry cannot express; it is checked before typed media content.
pub fn extract_image_with_media(entry: &Entry, media_image: Option<&str>) -> ImageSource {
    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.trim())
        .find(|uri| !uri.is_empty());
    if let Some(uri) = thumbnail {
        return ImageSource::Thumbnail(uri.to_owned());
    }

    if let Some(url) = media_image.map(str::trim).filter(|u| !u.is_empty()) {
        return ImageSource::MediaContent(url.to_owned());
    }

    let media_image = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter(|c| {
            c.content_type
                .as_ref()
                .is_some_and(|mime| mime.to_string().contains("image"))
        })
        .find_map(|c| c.url.as_ref());
    if let Some(url) = media_image {
        return ImageSource::MediaContent(url.to_string());
    }

    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .filter(|b| !b.is_empty())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.as_str()));

    body.and_then(first_embedded_image)
        .map(ImageSource::Embedded)
        .unwrap_or(ImageSource::Placeholder)
}

/// Reduces the entry's summary (or, without one, its content body) to at most
/// [`SUMMARY_MAX_CHARS`] characters of plaintext followed by `"..."`.
pub fn extract_summary(entry: &Entry) -> SummaryOutcome {
    let markup = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            entry
                .content
                .as_ref()
                .and_then(|c| c.body.as_deref())
                .filter(|b| !b.is_empty())
        });

    let Some(markup) = markup else {
        return SummaryOutcome::Absent;
    };

    match html_to_text(markup) {
        Ok(text) => SummaryOutcome::Text(format!(
            "{}{}",
            truncate_chars(&text, SUMMARY_MAX_CHARS),
            ELLIPSIS
        )),
        Err(e) => {
            tracing::debug!(error = %e, "Summary extraction failed, using placeholder");
            SummaryOutcome::Fallback(e)
        }
    }
}

/// Strips markup and returns single-line, control-character-free text.
pub fn html_to_text(markup: &str) -> Result<String, ExtractError> {
    if markup.len() > MAX_MARKUP_SIZE {
        return Err(ExtractError::MarkupTooLarge(markup.len()));
    }

    let fragment = Html::parse_fragment(markup);
    let raw: String = fragment.root_element().text().collect();
    let text = collapse_whitespace(&raw);
    Ok(strip_control_chars(&text).into_owned())
}

fn first_embedded_image(markup: &str) -> Option<String> {
    if markup.len() > MAX_MARKUP_SIZE {
        return None;
    }

    let fragment = Html::parse_fragment(markup);
    let src = fragment
        .select(img_selector())
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())?;
    Some(src.to_owned())
}

fn img_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("img[src]").expect("static selector is valid"))
}
