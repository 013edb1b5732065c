//! Session-scoped storage.
//!
//! A [`SessionStore`] owns the data of every live session. Each [`SessionStorage`] area is bound
//! to one [`SessionId`]; ending the session drops its data, the same way closing a tab drops its
//! `sessionStorage`.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::area::{AreaError, StorageArea};
use super::name::EngineName;
use super::probe::probe_area;
use super::quota::Quota;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type SessionMap = HashMap<SessionId, HashMap<String, String>>;

/// Holds the data of all sessions.
#[derive(Clone, Default)]
pub struct SessionStore {
    data: Arc<RwLock<SessionMap>>,
    quota: Quota,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quota applied to every area handed out by this store.
    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = quota;
        self
    }

    /// Returns the area for `session`, creating empty session data if needed.
    pub fn area(&self, session: SessionId) -> Result<SessionStorage> {
        self.data.write().map_err(AreaError::from)?.entry(session).or_default();

        Ok(SessionStorage {
            data: Arc::clone(&self.data),
            session,
            quota: self.quota,
            disabled: false,
        })
    }

    /// Starts a new session and returns its area.
    pub fn new_session(&self) -> Result<SessionStorage> {
        self.area(SessionId::new())
    }

    /// Drops all data stored for `session`.
    pub fn end_session(&self, session: SessionId) -> Result<()> {
        self.data.write().map_err(AreaError::from)?.remove(&session);
        Ok(())
    }

    /// Number of sessions currently holding data.
    pub fn session_count(&self) -> usize {
        self.data.read().map(|guard| guard.len()).unwrap_or(0)
    }
}

/// Storage area bound to a single session.
pub struct SessionStorage {
    data: Arc<RwLock<SessionMap>>,
    session: SessionId,
    quota: Quota,
    disabled: bool,
}

impl Default for SessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage {
    /// Creates an area for a fresh session in its own private store.
    pub fn new() -> Self {
        let session = SessionId::new();
        let mut map = SessionMap::new();
        map.insert(session, HashMap::new());

        Self {
            data: Arc::new(RwLock::new(map)),
            session,
            quota: Quota::default(),
            disabled: false,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn with_quota(mut self, quota: Quota) -> Self {
        self.quota = quota;
        self
    }

    /// Marks the area as disabled: every access fails, as session storage does in some
    /// privacy modes.
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

impl StorageArea for SessionStorage {
    fn is_supported(&self) -> bool {
        !self.disabled && probe_area(self)
    }

    fn fallback_engine(&self) -> Option<EngineName> {
        Some(EngineName::Memory)
    }

    fn get_item(&self, k: &str) -> Result<Option<String>> {
        self.ensure_enabled()?;
        Ok(self
            .data
            .read()
            .map_err(AreaError::from)?
            .get(&self.session)
            .and_then(|m| m.get(k).cloned()))
    }

    fn set_item(&self, k: &str, v: &str) -> Result<()> {
        self.ensure_enabled()?;
        let mut guard = self.data.write().map_err(AreaError::from)?;
        // An ended session starts over empty
        let map = guard.entry(self.session).or_default();

        let usage = map.iter().map(|(k, v)| Quota::entry_size(k, v)).sum();
        let replaced = map.get(k).map_or(0, |old| Quota::entry_size(k, old));
        self.quota.check(usage, replaced, Quota::entry_size(k, v))?;

        map.insert(k.to_string(), v.to_string());
        Ok(())
    }

    fn remove_item(&self, k: &str) -> Result<()> {
        self.ensure_enabled()?;
        if let Some(m) = self.data.write().map_err(AreaError::from)?.get_mut(&self.session) {
            m.remove(k);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.ensure_enabled()?;
        Ok(self
            .data
            .read()
            .map_err(AreaError::from)?
            .get(&self.session)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }
}
