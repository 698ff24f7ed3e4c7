//! Collection store.
//!
//! Every collection is a JSON array kept in `<data_dir>/<key>.json`, guarded
//! by its own async `RwLock`. Reads share it; writes hold it exclusively for
//! the whole read-modify-write and land through a temp file plus rename.
//! Collections never block each other.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::events::EventBus;

enum Backend {
    Dir(PathBuf),
    Memory(Mutex<HashMap<&'static str, String>>),
}

/// Outcome of a mutation closure passed to [`Database::update`].
pub enum Change<R> {
    /// Persist the modified collection.
    Commit(R),
    /// Leave the stored collection untouched.
    Keep(R),
}

/// Main store handle.
pub struct Database {
    backend: Backend,
    locks: Mutex<HashMap<&'static str, Arc<RwLock<()>>>>,
    events: EventBus,
}

impl Database {
    /// Open or create a store rooted at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::info!(path = %dir.display(), "Opened JSON store");
        Ok(Self {
            backend: Backend::Dir(dir),
            locks: Mutex::new(HashMap::new()),
            events: EventBus::new(),
        })
    }

    /// Volatile store, mostly for tests.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(Mutex::new(HashMap::new())),
            locks: Mutex::new(HashMap::new()),
            events: EventBus::new(),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Dir(dir) => Some(dir),
            Backend::Memory(_) => None,
        }
    }

    /// The lock for `key`, created on first use.
    fn lock_for(&self, key: &'static str) -> Arc<RwLock<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(key)
            .or_default()
            .clone()
    }

    /// Load a whole collection. A collection never written reads as empty.
    pub async fn load<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>> {
        let lock = self.lock_for(key);
        let _guard = lock.read().await;
        self.read_collection(key).await
    }

    /// Read-modify-write a collection under the write lock.
    pub async fn update<T, R, F>(&self, key: &'static str, mutate: F) -> Result<R>
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut Vec<T>) -> Change<R>,
    {
        let lock = self.lock_for(key);
        let _guard = lock.write().await;
        let mut items: Vec<T> = self.read_collection(key).await?;
        match mutate(&mut items) {
            Change::Commit(out) => {
                self.write_collection(key, &items).await?;
                Ok(out)
            }
            Change::Keep(out) => Ok(out),
        }
    }

    async fn read_collection<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>> {
        let raw = match self.read_raw(key).await? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        serde_json::from_str(&raw).map_err(|source| {
            tracing::error!(collection = key, error = %source, "Stored collection failed to parse");
            StoreError::Corrupt { key, source }
        })
    }

    async fn write_collection<T: Serialize>(&self, key: &'static str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string_pretty(items)?;
        self.write_raw(key, raw).await?;
        tracing::debug!(collection = key, count = items.len(), "Collection written");
        Ok(())
    }

    async fn read_raw(&self, key: &'static str) -> Result<Option<String>> {
        match &self.backend {
            Backend::Dir(dir) => match tokio::fs::read_to_string(dir.join(file_name(key))).await {
                Ok(raw) => Ok(Some(raw)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            },
            Backend::Memory(map) => Ok(map
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .get(key)
                .cloned()),
        }
    }

    async fn write_raw(&self, key: &'static str, raw: String) -> Result<()> {
        match &self.backend {
            Backend::Dir(dir) => {
                let target = dir.join(file_name(key));
                let tmp = dir.join(format!("{}.tmp", file_name(key)));
                tokio::fs::write(&tmp, raw).await?;
                tokio::fs::rename(&tmp, &target).await?;
                Ok(())
            }
            Backend::Memory(map) => {
                map.lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(key, raw);
                Ok(())
            }
        }
    }

    /// Raw write used by tests to plant malformed content.
    #[cfg(test)]
    pub(crate) async fn put_raw(&self, key: &'static str, raw: &str) -> Result<()> {
        self.write_raw(key, raw.to_string()).await
    }
}

fn file_name(key: &str) -> String {
    format!("{}.json", key)
}
