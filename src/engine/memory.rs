use std::collections::HashMap;
use std::sync::Mutex;
use anyhow::Result;

use super::area::{AreaError, StorageArea};

/// In-memory storage. Always supported and never falls back, so it terminates every
/// fallback chain. Contents live as long as the value itself.
#[derive(Default)]
pub struct MemoryStorage {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageArea for MemoryStorage {
    fn is_supported(&self) -> bool {
        true
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().map_err(AreaError::from)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .map_err(AreaError::from)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.map.lock().map_err(AreaError::from)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut v: Vec<String> = self.map.lock().map_err(AreaError::from)?.keys().cloned().collect();
        v.sort_unstable();
        Ok(v)
    }

    fn clear(&self, prefix: &str) -> Result<()> {
        self.map
            .lock()
            .map_err(AreaError::from)?
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}
