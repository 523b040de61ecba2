//! Feed aggregation and discovery.
//!
//! - [`parser`] - Turns RSS/Atom/JSON Feed bytes into [`Article`]s using `feed-rs`
//! - [`extract`] - Per-entry thumbnail and plaintext summary heuristics
//! - [`media`] - Media RSS image hints read straight from the XML
//! - [`fetcher`] - HTTP retrieval of one feed source with failure isolation
//! - [`aggregate`] - Bounded concurrent fan-out over a category's sources
//! - [`discovery`] - Feed link scanning on arbitrary web pages
//!
//! # Example
//!
//! ```ignore
//! use feedboard::feed::{Aggregator, Discoverer, FeedFetcher};
//!
//! let client = reqwest::Client::new();
//! let aggregator = Aggregator::new(FeedFetcher::new(client.clone()));
//! let articles = aggregator.aggregate(&config.feeds_in_category("Tech")).await;
//!
//! let discovery = Discoverer::new(client).discover("example.com").await;
//! ```

pub mod aggregate;
pub mod discovery;
pub mod extract;
pub mod fetcher;
pub mod media;
pub mod parser;

pub use aggregate::{
    aggregate, aggregate_detailed, sort_newest_first, Aggregation, Aggregator,
    DEFAULT_MAX_CONCURRENT_FETCHES,
};
pub use discovery::{
    DiscoveredFeed, Discoverer, Discovery, DiscoveryError, DEFAULT_DISCOVERY_TIMEOUT,
    MAX_DISCOVERY_RESULTS,
};
pub use extract::{
    extract_image, extract_image_with_media, extract_summary, ImageSource, SummaryOutcome,
    DEFAULT_PLACEHOLDER_IMAGE,
};
pub use fetcher::{FeedFetch, FeedFetcher, FetchError, SourceFetcher, DEFAULT_FETCH_TIMEOUT};
pub use parser::{Article, DEFAULT_MAX_ENTRIES};
