//! Category-based RSS/Atom aggregation and feed discovery.
//!
//! The crate exposes two operations to its callers:
//!
//! - [`feed::Aggregator::aggregate`] fetches every feed of a category with
//!   bounded concurrency and returns one newest-first article list.
//! - [`feed::Discoverer::discover`] scans an arbitrary web page for links that
//!   look like RSS/Atom feeds.
//!
//! User configuration (categories and feed sources) is reached through the
//! [`storage::UserStore`] trait.

pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
