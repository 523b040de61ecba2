//! Per-user configuration: categories, the feed sources filed under them, and
//! saved favorites.
//!
//! The aggregation core only reads [`UserConfig::feeds_in_category`]; editing
//! happens here and is persisted through a [`UserStore`].

mod json;
mod memory;
mod types;

pub use json::{JsonFileStore, USER_DATA_FILE};
pub use memory::MemoryStore;
pub use types::{
    Favorite, FeedSource, StorageError, UserConfig, DEFAULT_CATEGORIES, DEFAULT_FAV_CATEGORIES,
    LIMIT_CATEGORIES, LIMIT_FEEDS_PER_CATEGORY,
};

/// Loads and saves one user's configuration.
///
/// Loading a user that has never been saved returns [`UserConfig::default`].
pub trait UserStore {
    fn load(&self, user: &str) -> Result<UserConfig, StorageError>;
    fn save(&self, user: &str, config: &UserConfig) -> Result<(), StorageError>;

    /// Names of every stored user, sorted.
    fn users(&self) -> Result<Vec<String>, StorageError>;

    /// Removes a user and everything stored for them. Returns whether the
    /// user existed.
    fn delete_user(&self, user: &str) -> Result<bool, StorageError>;

    /// Stores a new user with the default configuration and returns it.
    ///
    /// # Errors
    ///
    /// [`StorageError::EmptyName`] for a blank name,
    /// [`StorageError::UserExists`] if the name is taken.
    fn create_user(&self, user: &str) -> Result<UserConfig, StorageError> {
        let user = user.trim();
        if user.is_empty() {
            return Err(StorageError::EmptyName);
        }
        if self.users()?.iter().any(|u| u == user) {
            return Err(StorageError::UserExists(user.to_owned()));
        }

        let config = UserConfig::default();
        self.save(user, &config)?;
        tracing::info!(user = %user, "User created");
        Ok(config)
    }
}
