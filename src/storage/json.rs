use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::types::{StorageError, UserConfig};
use super::UserStore;

/// File name of the user data document inside the data directory.
pub const USER_DATA_FILE: &str = "user_data.json";

/// All users' configuration in one pretty-printed JSON document.
///
/// The document maps user name to [`UserConfig`]. A missing, empty or
/// unparseable file reads as "no users yet".
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/user_data.json`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(USER_DATA_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every user's configuration.
    pub fn load_all(&self) -> Result<BTreeMap<String, UserConfig>, StorageError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No user data file, using defaults");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(all) => Ok(all),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "User data file is not valid JSON, starting from defaults"
                );
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_all(&self, all: &BTreeMap<String, UserConfig>) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(all)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let result = (|| -> std::io::Result<()> {
            let mut file = std::fs::File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
            drop(file);
            std::fs::rename(&temp_path, &self.path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(StorageError::Io(e));
        }
        Ok(())
    }
}

impl UserStore for JsonFileStore {
    fn load(&self, user: &str) -> Result<UserConfig, StorageError> {
        Ok(self.load_all()?.remove(user).unwrap_or_default())
    }

    fn save(&self, user: &str, config: &UserConfig) -> Result<(), StorageError> {
        let mut all = self.load_all()?;
        all.insert(user.to_owned(), config.clone());
        self.write_all(&all)?;
        tracing::debug!(path = %self.path.display(), user = %user, "User data saved");
        Ok(())
    }

    fn users(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.load_all()?.into_keys().collect())
    }

    fn delete_user(&self, user: &str) -> Result<bool, StorageError> {
        let mut all = self.load_all()?;
        if all.remove(user).is_none() {
            return Ok(false);
        }
        self.write_all(&all)?;
        tracing::info!(path = %self.path.display(), user = %user, "User deleted");
        Ok(true)
    }
}
