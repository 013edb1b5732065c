//! JSON-backed local storage.
//!
//! `JsonFileBackend` keeps every entry in one JSON file on disk. The whole map is cached in
//! memory; each mutation rewrites the file (write to a sibling temp file, then rename), so the
//! file on disk is always a complete snapshot. For large data sets prefer the SQLite backend.
//!
//! A file that cannot be parsed is treated as empty and overwritten on the next write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::area::AreaError;
use crate::engine::local::LocalBackend;

const FILE_VERSION: u32 = 1;

/// On-disk representation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalStorageFile {
    version: u32,
    entries: BTreeMap<String, String>,
}

pub struct JsonFileBackend {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileBackend {
    /// Opens the file at `path`, creating it (and its parent directory) if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            Self::load_file(&path)?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create directory {}", parent.display()))?;
            }
            BTreeMap::new()
        };

        let backend = Self {
            path,
            entries: RwLock::new(entries),
        };
        {
            let entries = backend.entries.read().map_err(AreaError::from)?;
            backend.save_file(&entries)?;
        }
        Ok(backend)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(path: &Path) -> Result<BTreeMap<String, String>> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read local storage file {}", path.display()))?;

        match serde_json::from_str::<LocalStorageFile>(&contents) {
            Ok(file) => Ok(file.entries),
            Err(e) => {
                log::warn!("Local storage file {} is corrupt, starting empty: {e}", path.display());
                Ok(BTreeMap::new())
            }
        }
    }

    fn save_file(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let file = LocalStorageFile {
            version: FILE_VERSION,
            entries: entries.clone(),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).with_context(|| format!("cannot write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("cannot replace {}", self.path.display()))?;
        Ok(())
    }

    /// Applies `f` to the entries and persists the result. The in-memory state is only updated
    /// when the write succeeds.
    fn mutate(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut guard = self.entries.write().map_err(AreaError::from)?;
        let mut next = guard.clone();
        f(&mut next);
        self.save_file(&next)?;
        *guard = next;
        Ok(())
    }
}

impl LocalBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().map_err(AreaError::from)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        if self.get(key)?.is_none() {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().map_err(AreaError::from)?.keys().cloned().collect())
    }

    fn usage(&self) -> Result<usize> {
        let guard = self.entries.read().map_err(AreaError::from)?;
        Ok(guard.iter().map(|(k, v)| k.len() + v.len()).sum())
    }
}
