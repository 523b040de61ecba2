//! Integration tests for saving read articles as favorites and managing users
//! in a `JsonFileStore`.

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use feedboard::feed::{Aggregator, FeedFetcher};
use feedboard::storage::{Favorite, JsonFileStore, StorageError, UserStore};

const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/"><channel><title>T</title>
  <item><title>Pancakes</title><link>https://food.example/pancakes</link>
    <pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate>
    <media:content url="https://food.example/pancakes.jpg" medium="image"/></item>
  <item><title>Waffles</title><link>https://food.example/waffles</link>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate></item>
</channel></rss>"#;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "feedboard-it-{name}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[tokio::test]
async fn test_read_then_save_favorites() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/food.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
        .mount(&server)
        .await;

    let dir = temp_dir("favorites");
    let store = JsonFileStore::in_dir(&dir);
    let mut config = store.create_user("cook").unwrap();
    config
        .add_feed("Food Blog", &format!("{}/food.xml", server.uri()), "Food")
        .unwrap();
    config.add_fav_category("Recipes").unwrap();
    store.save("cook", &config).unwrap();

    let articles = Aggregator::new(FeedFetcher::new(reqwest::Client::new()))
        .aggregate(&config.feeds_in_category("Food"))
        .await;
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].thumbnail, "https://food.example/pancakes.jpg");

    let mut config = store.load("cook").unwrap();
    for article in &articles {
        let favorite = Favorite::new(
            &article.title,
            &article.link,
            &article.thumbnail,
            &article.source,
            "Recipes",
        );
        assert!(config.save_favorite(favorite));
    }
    let again = Favorite::new("Dup", &articles[0].link, "", "", "Read Later");
    assert!(!config.save_favorite(again));
    store.save("cook", &config).unwrap();

    let reloaded = store.load("cook").unwrap();
    let titles: Vec<_> = reloaded.favorites_in("Recipes").map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["Waffles", "Pancakes"]);
    assert_eq!(reloaded.favorites[1].source, "Food Blog");

    let mut reloaded = reloaded;
    assert_eq!(reloaded.remove_fav_category("Recipes"), Some(2));
    store.save("cook", &reloaded).unwrap();
    assert!(store.load("cook").unwrap().favorites.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_user_lifecycle() {
    let dir = temp_dir("users");
    let store = JsonFileStore::in_dir(&dir);

    store.create_user("Default User").unwrap();
    store.create_user("guest").unwrap();
    assert!(matches!(
        store.create_user("guest"),
        Err(StorageError::UserExists(_))
    ));
    assert_eq!(store.users().unwrap(), vec!["Default User", "guest"]);

    let mut guest = store.load("guest").unwrap();
    assert_eq!(guest.remove_all_feeds(), 3);
    store.save("guest", &guest).unwrap();

    assert!(store.delete_user("guest").unwrap());
    assert_eq!(store.users().unwrap(), vec!["Default User"]);
    assert_eq!(store.load("Default User").unwrap().feeds.len(), 3);

    let _ = std::fs::remove_dir_all(&dir);
}
