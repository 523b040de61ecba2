use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ============================================================================
// Limits and Defaults
// ============================================================================

/// Maximum number of categories a user may create.
pub const LIMIT_CATEGORIES: usize = 50;

/// Maximum number of feed sources per category.
pub const LIMIT_FEEDS_PER_CATEGORY: usize = 30;

/// Categories every new user starts with.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "World News",
    "TV & Movies",
    "Comics",
    "Music",
    "Video Games",
    "Tech",
    "Food",
    "Other",
];

/// Favorites categories a new user starts with.
pub const DEFAULT_FAV_CATEGORIES: &[&str] = &["Read Later", "Best Of"];

/// Favorites category filled in for stored users that predate favorites.
const STORED_FAV_CATEGORY: &str = "Read Later";

fn stored_fav_categories() -> Vec<String> {
    vec![STORED_FAV_CATEGORY.to_owned()]
}

fn default_feeds() -> Vec<FeedSource> {
    [
        (
            "wn1",
            "CNN",
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCupvZG-5ko_eiXAupbDfxWw",
            "World News",
        ),
        (
            "wn2",
            "BBC News",
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC16niRr50-MSBwiO3YDb3RA",
            "World News",
        ),
        (
            "tc1",
            "MKBHD",
            "https://www.youtube.com/feeds/videos.xml?channel_id=UCBJycsmduvYEL83R_U4JriQ",
            "Tech",
        ),
    ]
    .into_iter()
    .map(|(id, name, url, category)| FeedSource {
        id: id.to_owned(),
        name: name.to_owned(),
        url: url.to_owned(),
        category: category.to_owned(),
    })
    .collect()
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors from loading, saving or editing a user's configuration.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access user data: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user data: {0}")]
    Json(#[from] serde_json::Error),

    /// The target category already holds [`LIMIT_FEEDS_PER_CATEGORY`] feeds.
    #[error("Category '{0}' already has the maximum of {LIMIT_FEEDS_PER_CATEGORY} feeds")]
    CategoryFull(String),

    #[error("Category limit of {LIMIT_CATEGORIES} reached")]
    TooManyCategories,

    #[error("Category '{0}' already exists")]
    DuplicateCategory(String),

    #[error("Name must not be empty")]
    EmptyName,

    #[error("User '{0}' already exists")]
    UserExists(String),
}

// ============================================================================
// Records
// ============================================================================

/// A configured RSS/Atom endpoint, owned by one user's feed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Unique within the owning user's feed list
    pub id: String,
    /// Display name, shown as the `source` of every article
    pub name: String,
    pub url: String,
    pub category: String,
}

/// An article the user saved, filed under one favorites category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    /// Identity of a favorite; saving the same link twice is a no-op
    #[serde(default, deserialize_with = "null_as_empty")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub source: String,
    /// Unix seconds (fractional) at which it was saved
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fav_category: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Favorite {
    /// A favorite stamped with the current time.
    pub fn new(title: &str, link: &str, thumbnail: &str, source: &str, fav_category: &str) -> Self {
        Self {
            title: title.trim().to_owned(),
            link: link.trim().to_owned(),
            thumbnail: thumbnail.trim().to_owned(),
            source: source.trim().to_owned(),
            timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            fav_category: fav_category.trim().to_owned(),
            extra: Map::new(),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Everything persisted for one user.
///
/// Missing fields in stored data fall back to the defaults a new user gets.
/// Fields this type does not know are kept in `extra` and written back on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub categories: Vec<String>,
    pub feeds: Vec<FeedSource>,
    #[serde(default = "stored_fav_categories")]
    pub fav_categories: Vec<String>,
    /// Saved articles, newest first
    pub favorites: Vec<Favorite>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES.iter().map(|c| (*c).to_owned()).collect(),
            feeds: default_feeds(),
            fav_categories: DEFAULT_FAV_CATEGORIES
                .iter()
                .map(|c| (*c).to_owned())
                .collect(),
            favorites: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl UserConfig {
    /// Feed sources in `category`, in the order they were added.
    pub fn feeds_in_category(&self, category: &str) -> Vec<FeedSource> {
        self.feeds
            .iter()
            .filter(|f| f.category == category)
            .cloned()
            .collect()
    }

    /// Appends a new feed source and returns it.
    ///
    /// The id is the current Unix time in seconds, suffixed with `-N` when
    /// another feed already uses it.
    ///
    /// # Errors
    ///
    /// [`StorageError::CategoryFull`] if `category` already holds
    /// [`LIMIT_FEEDS_PER_CATEGORY`] feeds.
    pub fn add_feed(
        &mut self,
        name: &str,
        url: &str,
        category: &str,
    ) -> Result<&FeedSource, StorageError> {
        let in_category = self.feeds.iter().filter(|f| f.category == category).count();
        if in_category >= LIMIT_FEEDS_PER_CATEGORY {
            return Err(StorageError::CategoryFull(category.to_owned()));
        }

        let id = self.next_feed_id();
        self.feeds.push(FeedSource {
            id,
            name: name.trim().to_owned(),
            url: url.trim().to_owned(),
            category: category.to_owned(),
        });

        tracing::debug!(name = %name, category = %category, "Feed added");
        Ok(&self.feeds[self.feeds.len() - 1])
    }

    /// Removes the feed with `id`. Returns whether anything was removed.
    pub fn remove_feed(&mut self, id: &str) -> bool {
        let before = self.feeds.len();
        self.feeds.retain(|f| f.id != id);
        self.feeds.len() != before
    }

    /// Removes every feed in `category` and returns how many were removed.
    pub fn remove_category_feeds(&mut self, category: &str) -> usize {
        let before = self.feeds.len();
        self.feeds.retain(|f| f.category != category);
        before - self.feeds.len()
    }

    /// Adds a category at the end of the list.
    ///
    /// # Errors
    ///
    /// [`StorageError::EmptyName`] for a blank name,
    /// [`StorageError::DuplicateCategory`] if it already exists,
    /// [`StorageError::TooManyCategories`] at [`LIMIT_CATEGORIES`].
    pub fn add_category(&mut self, name: &str) -> Result<(), StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::EmptyName);
        }
        if self.categories.iter().any(|c| c == name) {
            return Err(StorageError::DuplicateCategory(name.to_owned()));
        }
        if self.categories.len() >= LIMIT_CATEGORIES {
            return Err(StorageError::TooManyCategories);
        }
        self.categories.push(name.to_owned());
        Ok(())
    }

    /// Removes a category name. Feeds filed under it are left untouched; use
    /// [`UserConfig::remove_category_feeds`] to drop them too.
    pub fn remove_category(&mut self, name: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| c != name);
        self.categories.len() != before
    }

    /// Drops every feed source and returns how many there were.
    pub fn remove_all_feeds(&mut self) -> usize {
        std::mem::take(&mut self.feeds).len()
    }

    /// Favorites filed under `fav_category`, newest first.
    pub fn favorites_in<'a>(&'a self, fav_category: &'a str) -> impl Iterator<Item = &'a Favorite> {
        self.favorites
            .iter()
            .filter(move |f| f.fav_category == fav_category)
    }

    /// Adds a favorites category.
    ///
    /// # Errors
    ///
    /// [`StorageError::EmptyName`] for a blank name,
    /// [`StorageError::DuplicateCategory`] if it already exists.
    pub fn add_fav_category(&mut self, name: &str) -> Result<(), StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::EmptyName);
        }
        if self.fav_categories.iter().any(|c| c == name) {
            return Err(StorageError::DuplicateCategory(name.to_owned()));
        }
        self.fav_categories.push(name.to_owned());
        Ok(())
    }

    /// Removes a favorites category together with every favorite filed under
    /// it. Returns the number of favorites dropped, or `None` if no such
    /// category exists.
    pub fn remove_fav_category(&mut self, name: &str) -> Option<usize> {
        let pos = self.fav_categories.iter().position(|c| c == name)?;
        self.fav_categories.remove(pos);

        let before = self.favorites.len();
        self.favorites.retain(|f| f.fav_category != name);
        Some(before - self.favorites.len())
    }

    /// Puts `favorite` at the front of the list. Returns `false` and leaves
    /// the list untouched when a favorite with the same link already exists.
    pub fn save_favorite(&mut self, favorite: Favorite) -> bool {
        if self.favorites.iter().any(|f| f.link == favorite.link) {
            return false;
        }
        tracing::debug!(link = %favorite.link, category = %favorite.fav_category, "Favorite saved");
        self.favorites.insert(0, favorite);
        true
    }

    /// Removes the favorite with `link`. Returns whether anything was removed.
    pub fn remove_favorite(&mut self, link: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|f| f.link != link);
        self.favorites.len() != before
    }

    fn next_feed_id(&self) -> String {
        let base = chrono::Utc::now().timestamp().to_string();
        let taken = |id: &str| self.feeds.iter().any(|f| f.id == id);

        if !taken(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{base}-{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
