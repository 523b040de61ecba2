use std::collections::HashMap;
use std::sync::Mutex;

use super::types::{StorageError, UserConfig};
use super::UserStore;

/// In-process store, used by tests and by callers that keep configuration
/// elsewhere and only need to hand it to the aggregator.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<String, UserConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn load(&self, user: &str) -> Result<UserConfig, StorageError> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.get(user).cloned().unwrap_or_default())
    }

    fn save(&self, user: &str, config: &UserConfig) -> Result<(), StorageError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        users.insert(user.to_owned(), config.clone());
        Ok(())
    }

    fn users(&self) -> Result<Vec<String>, StorageError> {
        let users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = users.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete_user(&self, user: &str) -> Result<bool, StorageError> {
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        Ok(users.remove(user).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_gets_defaults() {
        let store = MemoryStore::new();
        assert_eq!(store.load("nobody").unwrap(), UserConfig::default());
    }

    #[test]
    fn test_user_management() {
        let store = MemoryStore::new();
        store.create_user("zoe").unwrap();
        store.create_user("amy").unwrap();
        assert_eq!(store.users().unwrap(), vec!["amy", "zoe"]);

        assert!(store.delete_user("zoe").unwrap());
        assert_eq!(store.users().unwrap(), vec!["amy"]);
    }

    #[test]
    fn test_save_replaces_config() {
        let store = MemoryStore::new();
        let mut config = UserConfig::default();
        config.remove_category_feeds("Tech");
        store.save("erin", &config).unwrap();

        assert!(store
            .load("erin")
            .unwrap()
            .feeds_in_category("Tech")
            .is_empty());
    }
}
