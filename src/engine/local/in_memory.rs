use std::collections::BTreeMap;
use std::sync::Mutex;
use anyhow::Result;

use crate::engine::local::LocalBackend;
use crate::engine::area::AreaError;

/// In‑memory local storage (no persistence). Used as a default when no durable backend is
/// configured.
#[derive(Default)]
pub struct InMemoryLocalBackend {
    map: Mutex<BTreeMap<String, String>>,
}

impl InMemoryLocalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalBackend for InMemoryLocalBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().map_err(AreaError::from)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .lock()
            .map_err(AreaError::from)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.lock().map_err(AreaError::from)?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        // BTreeMap keeps them ordered
        Ok(self.map.lock().map_err(AreaError::from)?.keys().cloned().collect())
    }

    fn usage(&self) -> Result<usize> {
        let guard = self.map.lock().map_err(AreaError::from)?;
        Ok(guard.iter().map(|(k, v)| k.len() + v.len()).sum())
    }
}
