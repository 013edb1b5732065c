//! JSON-backed cookie store.
//!
//! `JsonCookieStore` persists one cookie jar in a single JSON file on disk. Every
//! [`persist`](CookieStore::persist) rewrites the file completely (temp file + rename).
//! Unreadable or corrupt files load as an empty jar, so a damaged file never prevents startup.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::area::AreaError;
use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::store::CookieStore;

/// On-disk representation of the cookie jar.
#[derive(Debug, Serialize, Deserialize)]
struct CookieStoreFile {
    jar: DefaultCookieJar,
}

pub struct JsonCookieStore {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
    /// Serializes writers so two snapshots never interleave on disk.
    write_lock: Mutex<()>,
}

impl JsonCookieStore {
    /// Creates a store for the file at `path`. The file is created on the first write.
    pub fn new(path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CookieStore for JsonCookieStore {
    fn load(&self) -> Result<DefaultCookieJar> {
        if !self.path.exists() {
            return Ok(DefaultCookieJar::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read cookie store {}", self.path.display()))?;

        Ok(serde_json::from_str::<CookieStoreFile>(&contents)
            .map(|file| file.jar)
            .unwrap_or_else(|e| {
                log::warn!("Cookie store {} is corrupt, starting empty: {e}", self.path.display());
                DefaultCookieJar::new()
            }))
    }

    fn persist(&self, snapshot: &DefaultCookieJar) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(AreaError::from)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create cookie store directory {}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(&CookieStoreFile { jar: snapshot.clone() })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents).with_context(|| format!("cannot write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("cannot replace cookie store {}", self.path.display()))?;
        Ok(())
    }
}
