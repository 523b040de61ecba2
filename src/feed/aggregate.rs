use futures::stream::{self, StreamExt};

use super::fetcher::{FeedFetch, SourceFetcher};
use super::parser::Article;
use crate::storage::FeedSource;

/// Fetches in flight at once during one aggregation.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 5;

/// Merged result of one aggregation run.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// All articles, newest first
    pub articles: Vec<Article>,
    /// One entry per source, in input order, with `articles` drained
    pub fetches: Vec<FeedFetch>,
}

impl Aggregation {
    /// Sources whose fetch failed.
    pub fn failures(&self) -> impl Iterator<Item = &FeedFetch> {
        self.fetches.iter().filter(|f| f.is_failure())
    }
}

/// Fans a category's feed sources out over a bounded pool of fetches and
/// merges the results into one reverse-chronological list.
#[derive(Debug, Clone)]
pub struct Aggregator<F> {
    fetcher: F,
    max_concurrent: usize,
}

impl<F: SourceFetcher> Aggregator<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            max_concurrent: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Sets the concurrency bound; 0 is treated as 1.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetches every source and returns all articles, newest first.
    ///
    /// Failing sources contribute nothing; they never abort the batch.
    pub async fn aggregate(&self, sources: &[FeedSource]) -> Vec<Article> {
        aggregate(&self.fetcher, sources, self.max_concurrent).await
    }

    /// Like [`Aggregator::aggregate`], also returning per-source outcomes.
    pub async fn aggregate_detailed(&self, sources: &[FeedSource]) -> Aggregation {
        aggregate_detailed(&self.fetcher, sources, self.max_concurrent).await
    }
}

/// Fetches `sources` through `fetcher` and returns all articles, newest first.
pub async fn aggregate<F>(fetcher: &F, sources: &[FeedSource], max_concurrent: usize) -> Vec<Article>
where
    F: SourceFetcher + ?Sized,
{
    aggregate_detailed(fetcher, sources, max_concurrent)
        .await
        .articles
}

/// Fetches `sources` and merges the results, keeping per-source outcomes.
///
/// # Behavior
///
/// - At most `max_concurrent` fetches are in flight at any instant (0 acts as 1)
/// - Every fetch completes before merging starts; there is no short-circuit
/// - Articles are ordered by timestamp descending, ties by source name,
///   then by their position within the feed
pub async fn aggregate_detailed<F>(
    fetcher: &F,
    sources: &[FeedSource],
    max_concurrent: usize,
) -> Aggregation
where
    F: SourceFetcher + ?Sized,
{
    if sources.is_empty() {
        return Aggregation::default();
    }

    let mut fetches: Vec<(usize, FeedFetch)> = stream::iter(sources.iter().enumerate())
        .map(|(idx, source)| async move { (idx, fetcher.fetch(source).await) })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    // Completion order is arbitrary; restore input order so the merge is deterministic
    fetches.sort_by_key(|(idx, _)| *idx);

    let mut articles = Vec::new();
    let fetches: Vec<FeedFetch> = fetches
        .into_iter()
        .map(|(_, mut fetch)| {
            articles.append(&mut fetch.articles);
            fetch
        })
        .collect();

    sort_newest_first(&mut articles);

    let failed = fetches.iter().filter(|f| f.is_failure()).count();
    tracing::info!(
        sources = sources.len(),
        failed = failed,
        articles = articles.len(),
        "Aggregation complete"
    );

    Aggregation { articles, fetches }
}

/// Sorts by timestamp descending, then source name ascending. Stable, so
/// articles from the same source with equal timestamps keep feed order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.source.cmp(&b.source))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::fetcher::FetchError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn article(source: &str, title: &str, timestamp: i64) -> Article {
        Article {
            title: title.into(),
            link: format!("https://example.com/{title}"),
            thumbnail: String::new(),
            summary: String::new(),
            source: source.into(),
            published: "Recent".into(),
            timestamp,
        }
    }

    fn source(id: &str) -> FeedSource {
        FeedSource {
            id: id.into(),
            name: format!("Feed {id}"),
            url: format!("https://{id}.example/feed"),
            category: "Tech".into(),
        }
    }

    /// Serves canned articles per source id; ids listed in `failing` fail.
    /// Tracks how many fetches are in flight at once.
    #[derive(Default)]
    struct ScriptedFetcher {
        articles: HashMap<String, Vec<Article>>,
        failing: Vec<String>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceFetcher for ScriptedFetcher {
        async fn fetch(&self, source: &FeedSource) -> FeedFetch {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let failed = self.failing.contains(&source.id);
            FeedFetch {
                source_id: source.id.clone(),
                source_name: source.name.clone(),
                articles: if failed {
                    Vec::new()
                } else {
                    self.articles.get(&source.id).cloned().unwrap_or_default()
                },
                error: failed.then_some(FetchError::HttpStatus(500)),
            }
        }
    }

    #[tokio::test]
    async fn test_empty_sources() {
        let aggregator = Aggregator::new(ScriptedFetcher::default());
        let result = aggregator.aggregate_detailed(&[]).await;
        assert!(result.articles.is_empty());
        assert!(result.fetches.is_empty());
    }

    #[tokio::test]
    async fn test_merges_and_sorts_newest_first() {
        let mut fetcher = ScriptedFetcher::default();
        fetcher.articles.insert(
            "a".into(),
            vec![article("Feed a", "a1", 100), article("Feed a", "a2", 300)],
        );
        fetcher.articles.insert(
            "b".into(),
            vec![article("Feed b", "b1", 200), article("Feed b", "b2", 50)],
        );

        let articles = Aggregator::new(fetcher)
            .aggregate(&[source("a"), source("b")])
            .await;

        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a2", "b1", "a1", "b2"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let mut fetcher = ScriptedFetcher::default();
        for (id, ts) in [("s1", 10), ("s2", 40), ("s3", 30), ("s4", 20), ("s5", 50)] {
            fetcher
                .articles
                .insert(id.into(), vec![article(&format!("Feed {id}"), id, ts)]);
        }
        fetcher.failing = vec!["s2".into(), "s5".into()];

        let sources: Vec<_> = ["s1", "s2", "s3", "s4", "s5"]
            .into_iter()
            .map(source)
            .collect();
        let result = Aggregator::new(fetcher).aggregate_detailed(&sources).await;

        let titles: Vec<_> = result.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["s3", "s4", "s1"]);

        let failed: Vec<_> = result.failures().map(|f| f.source_id.as_str()).collect();
        assert_eq!(failed, vec!["s2", "s5"]);
        assert_eq!(result.fetches.len(), 5);
        assert!(result.fetches.iter().all(|f| f.articles.is_empty()));
    }

    #[tokio::test]
    async fn test_at_most_five_in_flight() {
        let fetcher = ScriptedFetcher {
            delay: Duration::from_millis(50),
            ..Default::default()
        };
        let sources: Vec<_> = (0..6).map(|i| source(&i.to_string())).collect();

        let aggregator = Aggregator::new(fetcher);
        aggregator.aggregate(&sources).await;

        assert_eq!(aggregator.fetcher().calls.load(Ordering::SeqCst), 6);
        let peak = aggregator.fetcher().max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= DEFAULT_MAX_CONCURRENT_FETCHES, "peak was {peak}");
        assert_eq!(peak, DEFAULT_MAX_CONCURRENT_FETCHES);
    }

    #[tokio::test]
    async fn test_custom_concurrency_bound() {
        let fetcher = ScriptedFetcher {
            delay: Duration::from_millis(20),
            ..Default::default()
        };
        let sources: Vec<_> = (0..6).map(|i| source(&i.to_string())).collect();

        let aggregator = Aggregator::new(fetcher).with_max_concurrent(2);
        aggregator.aggregate(&sources).await;
        assert!(aggregator.fetcher().max_in_flight.load(Ordering::SeqCst) <= 2);

        let serial = Aggregator::new(ScriptedFetcher::default()).with_max_concurrent(0);
        serial.aggregate(&sources).await;
        assert_eq!(serial.fetcher().max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_free_function_with_trait_object() {
        let mut fetcher = ScriptedFetcher::default();
        fetcher
            .articles
            .insert("x".into(), vec![article("Feed x", "only", 1)]);
        let dyn_fetcher: &dyn SourceFetcher = &fetcher;

        let articles = aggregate(dyn_fetcher, &[source("x"), source("y")], 0).await;
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "only");
    }

    #[test]
    fn test_sort_ties_break_on_source_name() {
        let mut articles = vec![
            article("Zeta", "z", 100),
            article("Alpha", "a1", 100),
            article("Alpha", "a2", 100),
            article("Mid", "m", 200),
        ];
        sort_newest_first(&mut articles);

        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["m", "a1", "a2", "z"]);
    }
}
