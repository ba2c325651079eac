//! Persistent local key-value store.
//!
//! Values are plain strings, mirroring browser `localStorage`. Structured
//! values are stored as JSON through [`read_json`] / [`write_json`].

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

mod file;
pub mod keys;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to access store file")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode store contents")]
    Encode(#[from] serde_json::Error),
}

pub trait LocalStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn keys(&self) -> Vec<String>;
}

pub type SharedStore = Arc<dyn LocalStore>;

/// Reads a JSON value. A corrupt value is logged and treated as absent.
pub fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::error!(err.msg = %error, err.details = ?error, key, "Corrupt stored value");
            None
        }
    }
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Removes every key that belongs to the signed-in user. Session credentials
/// are left alone.
#[tracing::instrument(name = "purge user scoped keys", skip_all)]
pub fn purge_user_scoped(store: &dyn LocalStore) -> Result<(), StorageError> {
    for key in keys::USER_SCOPED {
        store.remove(key)?;
    }

    for key in store.keys() {
        if keys::is_user_scoped_prefix(&key) {
            store.remove(&key)?;
        }
    }

    Ok(())
}

pub fn clear_credentials(store: &dyn LocalStore) -> Result<(), StorageError> {
    store.remove(keys::USER)?;
    store.remove(keys::TOKEN)?;
    store.remove(keys::REFRESH)
}

/// Reads a string, treating the empty string as absent.
pub fn get_non_empty(store: &dyn LocalStore, key: &str) -> Option<String> {
    store.get(key).filter(|value| !value.is_empty())
}
