//! Persistent auth token and cached user info.
//!
//! The store is a thin key-value layer: the token is an opaque string kept
//! under [`TOKEN_KEY`], and the cached user record is JSON kept under
//! [`USER_INFO_KEY`]. Nothing here validates or expires tokens; the server
//! rejects stale ones with a 401 and the HTTP client clears the store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_INFO_KEY: &str = "user_info";

/// Raw string storage keyed by fixed names.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// JSON object on disk; every write replaces the file through a temp file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| ClientError::Storage {
                message: format!("failed to prepare state directory: {error}"),
            })?;
        }

        let payload = serde_json::to_vec_pretty(entries).map_err(|error| ClientError::Storage {
            message: format!("failed to encode state payload: {error}"),
        })?;
        let temp_path = self.path.with_extension("json.tmp");

        std::fs::write(&temp_path, payload).map_err(|error| ClientError::Storage {
            message: format!("failed to write state payload: {error}"),
        })?;
        std::fs::rename(&temp_path, &self.path).map_err(|error| ClientError::Storage {
            message: format!("failed to finalize state payload: {error}"),
        })?;

        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    let raw = match std::fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return BTreeMap::new();
        }
        Err(error) => {
            tracing::warn!(
                target: "aiagent.token_store",
                path = %path.display(),
                error = %error,
                "failed to read session state; starting signed out",
            );
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(
                target: "aiagent.token_store",
                path = %path.display(),
                error = %error,
                "failed to parse session state; starting signed out",
            );
            BTreeMap::new()
        }
    }
}

/// Minimal user record cached next to the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUserInfo {
    pub user_id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStoredUserInfo {
    #[serde(default)]
    user_id: Option<i64>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

impl RawStoredUserInfo {
    fn validate(self) -> Option<StoredUserInfo> {
        let user_id = self.user_id.filter(|id| *id != 0)?;
        let username = self.username.filter(|value| !value.trim().is_empty())?;
        let role = self.role.filter(|value| !value.trim().is_empty())?;
        Some(StoredUserInfo {
            user_id,
            username,
            role,
        })
    }
}

#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}

impl TokenStore {
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileStorage::open(path)))
    }

    /// Storage read failures are logged and reported as "no token".
    #[must_use]
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token,
            Err(error) => {
                tracing::warn!(
                    target: "aiagent.token_store",
                    error = %error,
                    "failed to read auth token",
                );
                None
            }
        }
    }

    pub fn set_token(&self, token: &str) -> Result<(), ClientError> {
        self.storage.set(TOKEN_KEY, token)
    }

    pub fn remove_token(&self) -> Result<(), ClientError> {
        self.storage.remove(TOKEN_KEY)
    }

    /// Returns the cached user record when it is complete. An incomplete or
    /// unparseable record clears both the record and the token.
    #[must_use]
    pub fn user_info(&self) -> Option<StoredUserInfo> {
        let raw = match self.storage.get(USER_INFO_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(
                    target: "aiagent.token_store",
                    error = %error,
                    "failed to read cached user info",
                );
                return None;
            }
        };

        let validated = serde_json::from_str::<RawStoredUserInfo>(&raw)
            .ok()
            .and_then(RawStoredUserInfo::validate);
        if validated.is_none() {
            tracing::warn!(
                target: "aiagent.token_store",
                "cached user info is incomplete; clearing stored credentials",
            );
            if let Err(error) = self.clear() {
                tracing::warn!(
                    target: "aiagent.token_store",
                    error = %error,
                    "failed to clear stored credentials",
                );
            }
        }
        validated
    }

    pub fn set_user_info(&self, info: &StoredUserInfo) -> Result<(), ClientError> {
        let payload = serde_json::to_string(info).map_err(|error| ClientError::Storage {
            message: format!("failed to encode user info: {error}"),
        })?;
        self.storage.set(USER_INFO_KEY, &payload)
    }

    pub fn remove_user_info(&self) -> Result<(), ClientError> {
        self.storage.remove(USER_INFO_KEY)
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        self.remove_token()?;
        self.remove_user_info()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }
}
