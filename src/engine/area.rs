use super::name::EngineName;
use anyhow::Result;
use std::sync::PoisonError;

/// Object-safe raw key/value adapter for one storage engine (DOM's Storage).
///
/// Areas know nothing about key prefixes or typed values: keys arrive fully prefixed and values
/// are already encoded. Implementations synchronize internally, every method takes `&self`.
pub trait StorageArea: Send + Sync {
    /// Returns `true` when the area is usable in the current environment.
    ///
    /// Called at most once per engine per [`Storage`](crate::Storage) instance.
    fn is_supported(&self) -> bool;

    /// Engine to use instead when this area is not supported. `None` means memory.
    fn fallback_engine(&self) -> Option<EngineName> {
        None
    }

    /// Retrieves the value associated with the given key, or `None` if not found.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Sets the value for the given key, overwriting any existing value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the item with the given key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Returns all keys currently stored in the area.
    fn keys(&self) -> Result<Vec<String>>;

    /// Removes every item whose key starts with `prefix`. An empty prefix clears the area.
    fn clear(&self, prefix: &str) -> Result<()> {
        for key in self.keys()? {
            if key.starts_with(prefix) {
                self.remove_item(&key)?;
            }
        }
        Ok(())
    }

    /// Returns the number of items in the storage area.
    fn len(&self) -> usize {
        self.keys().map(|keys| keys.len()).unwrap_or(0)
    }
}

/// Failures raised by the built-in areas.
#[derive(Debug, thiserror::Error)]
pub enum AreaError {
    #[error("storage quota exceeded: {requested} bytes requested, {limit} bytes allowed")]
    QuotaExceeded { requested: usize, limit: usize },

    #[error("storage area is disabled")]
    Disabled,

    #[error("storage area lock is poisoned")]
    Poisoned,

    #[error("cookie storage has no cookie jar")]
    NoCookieJar,
}

impl<T> From<PoisonError<T>> for AreaError {
    fn from(_: PoisonError<T>) -> Self {
        AreaError::Poisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryStorage;
    use crate::engine::session::SessionStorage;

    fn set(area: &dyn StorageArea, k: &str, v: &str) {
        area.set_item(k, v).unwrap();
    }

    fn contract(area: &dyn StorageArea) {
        // starts empty
        assert_eq!(area.len(), 0);
        assert!(area.get_item("missing").unwrap().is_none());

        // set + get
        set(area, "a", "1");
        set(area, "b", "2");
        assert_eq!(area.len(), 2);
        assert_eq!(area.get_item("a").unwrap().as_deref(), Some("1"));
        assert_eq!(area.get_item("b").unwrap().as_deref(), Some("2"));

        // overwrite keeps len()
        set(area, "a", "ONE");
        assert_eq!(area.len(), 2);
        assert_eq!(area.get_item("a").unwrap().as_deref(), Some("ONE"));

        // remove, twice
        area.remove_item("b").unwrap();
        area.remove_item("b").unwrap();
        assert_eq!(area.len(), 1);
        assert!(area.get_item("b").unwrap().is_none());

        // clear
        area.clear("").unwrap();
        assert_eq!(area.len(), 0);
    }

    #[test]
    fn storagearea_basic_contract() {
        contract(&MemoryStorage::new());
        contract(&SessionStorage::new());
    }

    #[test]
    fn default_clear_only_touches_matching_prefix() {
        // SessionStorage relies on the trait's default clear()
        let area = SessionStorage::new();
        for key in ["app.a", "app.b", "apple", "other"] {
            set(&area, key, "x");
        }

        area.clear("app.").unwrap();

        let mut keys = area.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["apple".to_string(), "other".to_string()]);
    }
}
