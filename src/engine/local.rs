//! Durable local storage.
//!
//! [`LocalStorage`] is the adapter for the `local` engine. It adds quota enforcement and the
//! capability probe on top of a [`LocalBackend`], which only knows how to keep strings around:
//!
//! - [`InMemoryLocalBackend`]: no persistence, for tests and private profiles.
//! - [`JsonFileBackend`]: a single JSON file, rewritten on every mutation.
//! - [`SqliteLocalBackend`]: SQLite through an `r2d2` pool (feature `sqlite_store`).
//!
//! When local storage is unusable the engine falls back to cookies.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::Result;

use super::area::{AreaError, StorageArea};
use super::name::EngineName;
use super::probe::probe_area;
use super::quota::Quota;

/// In-memory local storage backend.
pub mod in_memory;
/// JSON file backed local storage backend.
pub mod json_file;
/// SQLite-backed local storage backend.
#[cfg(feature = "sqlite_store")]
pub mod sqlite_store;

pub use in_memory::InMemoryLocalBackend;
pub use json_file::JsonFileBackend;
#[cfg(feature = "sqlite_store")]
pub use sqlite_store::SqliteLocalBackend;

/// Raw persistence for local storage.
pub trait LocalBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;

    /// Bytes used by all keys and values together.
    fn usage(&self) -> Result<usize> {
        let mut total = 0;
        for key in self.keys()? {
            let value = self.get(&key)?.unwrap_or_default();
            total += Quota::entry_size(&key, &value);
        }
        Ok(total)
    }
}

/// Adapter for the `local` engine.
pub struct LocalStorage {
    backend: Arc<dyn LocalBackend>,
    quota: Quota,
    disabled: bool,
}

impl LocalStorage {
    pub fn new(backend: Arc<dyn LocalBackend>) -> Self {
        Self {
            backend,
            quota: Quota::default(),
            disabled: false,
        }
    }

    /// Local storage that forgets everything when dropped.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryLocalBackend::new()))
    }

    /// Local storage persisted in the JSON file at `path`.
    pub fn json_file(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::new(Arc::new(JsonFileBackend::open(path)?)))
    }

    /// Local storage persisted in the SQLite database at `path`, isolated by `scope`
    /// (typically the origin of the application).
    #[cfg(feature = "sqlite_store")]
    pub fn sqlite(path: &str, scope: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(SqliteLocalBackend::new(path, scope)?)))
    }

    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = quota;
        self
    }

    /// Marks the area as disabled: every access fails.
    pub fn disable(mut self) -> Self {
        self.disabled = true;
        self
    }

    fn ensure_enabled(&self) -> Result<(), AreaError> {
        if self.disabled {
            return Err(AreaError::Disabled);
        }
        Ok(())
    }
}

impl StorageArea for LocalStorage {
    fn is_supported(&self) -> bool {
        !self.disabled && probe_area(self)
    }

    fn fallback_engine(&self) -> Option<EngineName> {
        Some(EngineName::Cookie)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.ensure_enabled()?;
        self.backend.get(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.ensure_enabled()?;
        if self.quota != Quota::Unlimited {
            let usage = self.backend.usage()?;
            let replaced = self
                .backend
                .get(key)?
                .map_or(0, |old| Quota::entry_size(key, &old));
            self.quota.check(usage, replaced, Quota::entry_size(key, value))?;
        }
        self.backend.set(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.ensure_enabled()?;
        self.backend.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.ensure_enabled()?;
        self.backend.keys()
    }
}
