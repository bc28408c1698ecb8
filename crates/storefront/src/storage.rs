//! Durable key-value storage for client state.
//!
//! Plays the role the browser's `localStorage` plays for a web storefront:
//! a small string map that survives restarts. Writes replace whole values;
//! concurrent writers are last-writer-wins by design.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::warn;

/// Storage keys for durable client state.
pub mod keys {
    /// Key for the serialized cart line items.
    pub const SHOPPING_CART: &str = "shopping-cart";

    /// Key for the signed-in user's backend token.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Key for the snapshot of an initiated but unconfirmed checkout.
    pub const CHECKOUT_IN_PROGRESS: &str = "checkout-in-progress";
}

/// Errors that can occur reading or writing durable state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying file could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be serialized.
    #[error("storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A durable string key-value store.
pub trait StorageBackend: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// FileStorage
// =============================================================================

/// File-backed storage: one JSON map, rewritten whole on every mutation.
///
/// A corrupt backing file is treated as empty and heals on the next write;
/// losing stale client state beats refusing to start.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    const FILE_NAME: &'static str = "storage.json";

    /// Open (creating if needed) the storage file under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = data_dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            path: dir.join(Self::FILE_NAME),
            lock: Mutex::new(()),
        })
    }

    fn load_map(&self) -> Result<HashMap<String, String>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(err) => {
                warn!(error = %err, path = %self.path.display(), "discarding corrupt storage file");
                Ok(HashMap::new())
            }
        }
    }

    fn store_map(&self, map: &HashMap<String, String>) -> Result<(), StorageError> {
        let payload = serde_json::to_string(map)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard();
        Ok(self.load_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut map = self.load_map()?;
        map.insert(key.to_string(), value.to_string());
        self.store_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.guard();
        let mut map = self.load_map()?;
        if map.remove(key).is_some() {
            self.store_map(&map)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage").field("path", &self.path).finish()
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.guard().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.guard().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.guard().remove(key);
        Ok(())
    }
}

// =============================================================================
// Auth token helpers
// =============================================================================

/// Read the stored backend token, if the user is signed in.
///
/// # Errors
///
/// Returns an error if the backing store cannot be read.
pub fn stored_auth_token(storage: &dyn StorageBackend) -> Result<Option<SecretString>, StorageError> {
    Ok(storage.get(keys::AUTH_TOKEN)?.map(SecretString::from))
}

/// Persist the backend token after sign-in.
///
/// # Errors
///
/// Returns an error if the backing store cannot be written.
pub fn store_auth_token(
    storage: &dyn StorageBackend,
    token: &SecretString,
) -> Result<(), StorageError> {
    storage.set(keys::AUTH_TOKEN, token.expose_secret())
}

/// Drop the stored token on sign-out.
///
/// # Errors
///
/// Returns an error if the backing store cannot be written.
pub fn clear_auth_token(storage: &dyn StorageBackend) -> Result<(), StorageError> {
    storage.remove(keys::AUTH_TOKEN)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trips() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("v".to_string()));
        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.set(keys::SHOPPING_CART, "[]").unwrap();
        storage.set("other", "x").unwrap();

        // A second handle over the same directory sees the same data.
        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get(keys::SHOPPING_CART).unwrap(), Some("[]".to_string()));

        reopened.remove(keys::SHOPPING_CART).unwrap();
        assert_eq!(storage.get(keys::SHOPPING_CART).unwrap(), None);
        assert_eq!(storage.get("other").unwrap(), Some("x".to_string()));
    }

    #[test]
    fn corrupt_file_heals_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        fs::write(dir.path().join(FileStorage::FILE_NAME), "{not json").unwrap();

        assert_eq!(storage.get("k").unwrap(), None);
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn auth_token_helpers_round_trip() {
        let storage = MemoryStorage::new();
        assert!(stored_auth_token(&storage).unwrap().is_none());

        store_auth_token(&storage, &SecretString::from("tkn-123")).unwrap();
        let token = stored_auth_token(&storage).unwrap().unwrap();
        assert_eq!(token.expose_secret(), "tkn-123");

        clear_auth_token(&storage).unwrap();
        assert!(stored_auth_token(&storage).unwrap().is_none());
    }
}
