//! Integration tests for reading a category: stored feed sources are fetched
//! from a mock HTTP server, merged, and sorted.
//!
//! Each test starts its own `MockServer` and store for isolation.

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedboard::feed::{Aggregator, FeedFetcher, FetchError};
use feedboard::storage::{MemoryStore, UserConfig, UserStore};

fn rss(items: &[(&str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(title, date)| {
            format!(
                "<item><title>{title}</title><link>https://example.com/{title}</link>\
                 <pubDate>{date}</pubDate>\
                 <description>&lt;p&gt;About {title}&lt;/p&gt;</description></item>"
            )
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{items}</channel></rss>"#)
}

async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// A user with only the given `(name, route)` feeds in the "Tech" category.
fn seeded_store(server: &MockServer, feeds: &[(&str, &str)]) -> MemoryStore {
    let mut config = UserConfig {
        categories: vec!["Tech".into(), "Food".into()],
        feeds: Vec::new(),
        ..UserConfig::default()
    };
    for (name, route) in feeds {
        config
            .add_feed(name, &format!("{}{route}", server.uri()), "Tech")
            .unwrap();
    }
    config
        .add_feed("Elsewhere", "https://unused.example/feed", "Food")
        .unwrap();

    let store = MemoryStore::new();
    store.save("alice", &config).unwrap();
    store
}

#[tokio::test]
async fn test_read_category_merges_newest_first() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/a",
        ResponseTemplate::new(200).set_body_string(rss(&[
            ("a-new", "Wed, 03 Jan 2024 00:00:00 GMT"),
            ("a-old", "Mon, 01 Jan 2024 00:00:00 GMT"),
        ])),
    )
    .await;
    mount(
        &server,
        "/b",
        ResponseTemplate::new(200).set_body_string(rss(&[(
            "b-mid",
            "Tue, 02 Jan 2024 00:00:00 GMT",
        )])),
    )
    .await;

    let store = seeded_store(&server, &[("Alpha", "/a"), ("Beta", "/b")]);
    let sources = store.load("alice").unwrap().feeds_in_category("Tech");
    assert_eq!(sources.len(), 2);

    let articles = Aggregator::new(FeedFetcher::new(reqwest::Client::new()))
        .aggregate(&sources)
        .await;

    let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["a-new", "b-mid", "a-old"]);
    assert_eq!(articles[1].source, "Beta");
    assert_eq!(articles[1].summary, "About b-mid...");
    assert_eq!(articles[1].published, "Tue, 2 Jan 2024 00:00:00 +0000");
}

#[tokio::test]
async fn test_failing_sources_are_reported_not_fatal() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/good",
        ResponseTemplate::new(200).set_body_string(rss(&[(
            "kept",
            "Mon, 01 Jan 2024 00:00:00 GMT",
        )])),
    )
    .await;
    mount(&server, "/gone", ResponseTemplate::new(404)).await;
    mount(
        &server,
        "/junk",
        ResponseTemplate::new(200).set_body_string("this is not a feed"),
    )
    .await;

    let store = seeded_store(
        &server,
        &[("Good", "/good"), ("Gone", "/gone"), ("Junk", "/junk")],
    );
    let sources = store.load("alice").unwrap().feeds_in_category("Tech");

    let result = Aggregator::new(FeedFetcher::new(reqwest::Client::new()))
        .aggregate_detailed(&sources)
        .await;

    assert_eq!(result.articles.len(), 1);
    assert_eq!(result.articles[0].title, "kept");

    let failed: Vec<_> = result.failures().map(|f| f.source_name.as_str()).collect();
    assert_eq!(failed, vec!["Gone", "Junk"]);
    assert!(matches!(
        result.fetches[1].error,
        Some(FetchError::HttpStatus(404))
    ));
    assert!(matches!(result.fetches[2].error, Some(FetchError::Parse(_))));
}

#[tokio::test]
async fn test_empty_category_yields_no_articles() {
    let server = MockServer::start().await;
    let store = seeded_store(&server, &[]);
    let sources = store.load("alice").unwrap().feeds_in_category("Tech");
    assert!(sources.is_empty());

    let articles = Aggregator::new(FeedFetcher::new(reqwest::Client::new()))
        .aggregate(&sources)
        .await;
    assert!(articles.is_empty());
}

#[tokio::test]
async fn test_undated_entries_sort_as_current() {
    let server = MockServer::start().await;
    let undated = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>
        <item><title>fresh</title><link>https://example.com/fresh</link></item>
    </channel></rss>"#;
    mount(
        &server,
        "/dated",
        ResponseTemplate::new(200).set_body_string(rss(&[(
            "old",
            "Mon, 01 Jan 2024 00:00:00 GMT",
        )])),
    )
    .await;
    mount(
        &server,
        "/undated",
        ResponseTemplate::new(200).set_body_string(undated),
    )
    .await;

    let store = seeded_store(&server, &[("Dated", "/dated"), ("Undated", "/undated")]);
    let sources = store.load("alice").unwrap().feeds_in_category("Tech");

    let articles = Aggregator::new(FeedFetcher::new(reqwest::Client::new()))
        .aggregate(&sources)
        .await;

    let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["fresh", "old"]);
    assert_eq!(articles[0].published, "Recent");
}
