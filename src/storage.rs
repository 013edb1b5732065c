//! The storage façade.
//!
//! [`Storage`] is what applications talk to. It owns the configuration, resolves engines through
//! the [`EngineResolver`] and hands out [`EngineStorage`] handles, each bound for good to the
//! adapter its engine resolved to. Operations on `Storage` itself go to the default engine.
//!
//! Every key is namespaced with the configured prefix before it reaches an adapter, and every
//! value goes through the [`codec`](crate::codec).
//!
//! ```
//! use gosub_storage::{EngineName, Storage};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), gosub_storage::StorageError> {
//! let storage = Storage::with_defaults()?;
//!
//! assert!(storage.set("user", &json!({"name": "jane", "visits": 3})).into_value());
//! assert_eq!(storage.get("user").into_value(), json!({"name": "jane", "visits": 3}));
//!
//! let session = storage.engine(&EngineName::Session)?;
//! assert!(session.set("tab", "inbox").into_value());
//! assert_eq!(session.get("tab").into_value(), json!("inbox"));
//! assert_eq!(storage.get("tab").into_value(), json!(null));
//! # Ok(()) }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::codec;
use crate::config::{ConfigError, StorageConfig};
use crate::engine::{EngineName, EngineRegistry, EngineResolver, StorageArea};
use crate::errors::StorageError;
use crate::event::{StorageBus, StorageEvent, Subscription};

/// Result of a soft-failing storage operation.
///
/// The value is always present: on failure it is the operation's fallback (`false` for writes,
/// the default for reads) and [`error`](Self::error) says what went wrong.
#[must_use]
#[derive(Debug)]
pub struct Outcome<T> {
    value: T,
    error: Option<StorageError>,
}

impl<T> Outcome<T> {
    fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    fn failed(value: T, error: StorageError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn error(&self) -> Option<&StorageError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_parts(self) -> (T, Option<StorageError>) {
        (self.value, self.error)
    }

    /// Discards the fallback value when the operation failed.
    pub fn into_result(self) -> Result<T, StorageError> {
        match self.error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }
}

/// Storage bound to a single engine.
///
/// Cloning is cheap; clones share the adapter.
#[derive(Clone)]
pub struct EngineStorage {
    engine: EngineName,
    area: Arc<dyn StorageArea>,
    prefix: Arc<str>,
    bus: Arc<StorageBus>,
}

impl std::fmt::Debug for EngineStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineStorage")
            .field("engine", &self.engine)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl EngineStorage {
    /// The engine this handle was requested for. When that engine was unsupported the handle is
    /// served by its fallback, but keeps the requested name.
    pub fn engine(&self) -> &EngineName {
        &self.engine
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn area(&self) -> &Arc<dyn StorageArea> {
        &self.area
    }

    /// Returns `true` when both handles are served by the same adapter.
    pub fn shares_backend_with(&self, other: &EngineStorage) -> bool {
        Arc::as_ptr(&self.area) as *const () == Arc::as_ptr(&other.area) as *const ()
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Reads the current raw value, but only when someone is listening for changes.
    fn old_value(&self, key: &str) -> Option<String> {
        if !self.bus.has_subscribers() {
            return None;
        }
        self.area.get_item(key).ok().flatten()
    }

    /// Stores any serializable value under `key`.
    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Outcome<bool> {
        if key.is_empty() {
            return Outcome::failed(false, StorageError::EmptyKey);
        }
        match serde_json::to_value(value) {
            Ok(value) => self.set_value(key, &value),
            Err(e) => Outcome::failed(false, e.into()),
        }
    }

    /// Stores `value` under `key`.
    ///
    /// `null` is stored as an empty entry. The key stays present, so a later [`get_or`] returns
    /// `null` rather than the caller's default; use [`remove`] to make the key absent.
    ///
    /// [`get_or`]: EngineStorage::get_or
    /// [`remove`]: EngineStorage::remove
    pub fn set_value(&self, key: &str, value: &Value) -> Outcome<bool> {
        if key.is_empty() {
            return Outcome::failed(false, StorageError::EmptyKey);
        }

        let key = self.prefixed(key);
        let raw = codec::encode(value).unwrap_or_default();
        let old_value = self.old_value(&key);

        match self.area.set_item(&key, &raw) {
            Ok(()) => {
                self.bus.publish(StorageEvent::Changed {
                    engine: self.engine.clone(),
                    key,
                    old_value,
                    new_value: Some(raw),
                });
                Outcome::ok(true)
            }
            Err(e) => {
                log::debug!("Storage engine {}: set {key} failed: {e:#}", self.engine);
                Outcome::failed(false, StorageError::Adapter(e))
            }
        }
    }

    /// Reads `key`, yielding `null` when it is absent.
    pub fn get(&self, key: &str) -> Outcome<Value> {
        self.get_or(key, Value::Null)
    }

    /// Reads `key`, yielding `default` when it is absent or cannot be read. A key holding a
    /// stored `null` is present and reads as `null`.
    pub fn get_or(&self, key: &str, default: Value) -> Outcome<Value> {
        if key.is_empty() {
            return Outcome::failed(default, StorageError::EmptyKey);
        }

        let key = self.prefixed(key);
        match self.area.get_item(&key) {
            Ok(Some(raw)) => Outcome::ok(codec::decode(&raw)),
            Ok(None) => Outcome::ok(default),
            Err(e) => {
                log::debug!("Storage engine {}: get {key} failed: {e:#}", self.engine);
                Outcome::failed(default, StorageError::Adapter(e))
            }
        }
    }

    /// Reads `key` into a typed value. Absent and `null` entries read as `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Outcome<Option<T>> {
        let (value, error) = self.get(key).into_parts();
        if let Some(e) = error {
            return Outcome::failed(None, e);
        }
        if value.is_null() {
            return Outcome::ok(None);
        }
        match serde_json::from_value(value) {
            Ok(v) => Outcome::ok(Some(v)),
            Err(e) => Outcome::failed(None, e.into()),
        }
    }

    pub fn remove(&self, key: &str) -> Outcome<bool> {
        if key.is_empty() {
            return Outcome::failed(false, StorageError::EmptyKey);
        }

        let key = self.prefixed(key);
        let old_value = self.old_value(&key);

        match self.area.remove_item(&key) {
            Ok(()) => {
                self.bus.publish(StorageEvent::Changed {
                    engine: self.engine.clone(),
                    key,
                    old_value,
                    new_value: None,
                });
                Outcome::ok(true)
            }
            Err(e) => {
                log::debug!("Storage engine {}: remove {key} failed: {e:#}", self.engine);
                Outcome::failed(false, StorageError::Adapter(e))
            }
        }
    }

    /// Removes every entry whose prefixed key starts with the storage prefix followed by
    /// `prefix`. Adapter failures are returned as-is.
    pub fn clear(&self, prefix: &str) -> Result<(), StorageError> {
        let prefix = self.prefixed(prefix);
        self.area.clear(&prefix).map_err(StorageError::Adapter)?;

        self.bus.publish(StorageEvent::Cleared {
            engine: self.engine.clone(),
            prefix,
        });
        Ok(())
    }
}

/// The storage façade.
pub struct Storage {
    config: StorageConfig,
    resolver: EngineResolver,
    handles: Mutex<HashMap<EngineName, EngineStorage>>,
    default: EngineStorage,
    bus: Arc<StorageBus>,
}

impl Storage {
    /// Builds a façade over `registry`.
    ///
    /// Fails when an enabled engine has no registered adapter. The default engine is resolved
    /// right away, so its fallback (if any) is decided here.
    pub fn new(config: StorageConfig, registry: EngineRegistry) -> Result<Self, StorageError> {
        if let Some(missing) = config.enabled_engines().iter().find(|e| !registry.contains(e)) {
            return Err(ConfigError::UnregisteredEngine(missing.clone()).into());
        }

        let bus = Arc::new(StorageBus::default());
        let resolver = EngineResolver::new(registry, bus.clone());
        let prefix: Arc<str> = Arc::from(config.prefix());

        let default_name = config.default_engine().clone();
        let default = EngineStorage {
            engine: default_name.clone(),
            area: resolver.resolve(&default_name)?,
            prefix,
            bus: bus.clone(),
        };

        log::debug!(
            "Storage created: prefix {:?}, engines {:?}, default {}",
            config.prefix(),
            config.enabled_engines(),
            default_name
        );

        let mut handles = HashMap::new();
        handles.insert(default_name, default.clone());

        Ok(Self {
            config,
            resolver,
            handles: Mutex::new(handles),
            default,
            bus,
        })
    }

    /// Default configuration over the built-in engines.
    pub fn with_defaults() -> Result<Self, StorageError> {
        Self::new(StorageConfig::default(), EngineRegistry::builtin())
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn resolver(&self) -> &EngineResolver {
        &self.resolver
    }

    /// Handle for the default engine.
    pub fn default_engine(&self) -> &EngineStorage {
        &self.default
    }

    /// Handle bound to `name`. The first call per engine resolves it; later calls return the
    /// same handle.
    pub fn engine(&self, name: &EngineName) -> Result<EngineStorage, StorageError> {
        if !self.config.is_enabled(name) {
            return Err(StorageError::EngineNotEnabled(name.clone()));
        }

        let mut handles = self.handles.lock().map_err(|_| StorageError::Poisoned)?;
        if let Some(handle) = handles.get(name) {
            return Ok(handle.clone());
        }

        let handle = EngineStorage {
            engine: name.clone(),
            area: self.resolver.resolve(name)?,
            prefix: self.default.prefix.clone(),
            bus: self.bus.clone(),
        };
        handles.insert(name.clone(), handle.clone());
        Ok(handle)
    }

    pub fn memory(&self) -> Result<EngineStorage, StorageError> {
        self.engine(&EngineName::Memory)
    }

    pub fn session(&self) -> Result<EngineStorage, StorageError> {
        self.engine(&EngineName::Session)
    }

    pub fn local(&self) -> Result<EngineStorage, StorageError> {
        self.engine(&EngineName::Local)
    }

    pub fn cookie(&self) -> Result<EngineStorage, StorageError> {
        self.engine(&EngineName::Cookie)
    }

    /// Receives change, clear and fallback events from now on.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Outcome<bool> {
        self.default.set(key, value)
    }

    pub fn set_value(&self, key: &str, value: &Value) -> Outcome<bool> {
        self.default.set_value(key, value)
    }

    pub fn get(&self, key: &str) -> Outcome<Value> {
        self.default.get(key)
    }

    pub fn get_or(&self, key: &str, default: Value) -> Outcome<Value> {
        self.default.get_or(key, default)
    }

    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Outcome<Option<T>> {
        self.default.get_as(key)
    }

    pub fn remove(&self, key: &str) -> Outcome<bool> {
        self.default.remove(key)
    }

    pub fn clear(&self, prefix: &str) -> Result<(), StorageError> {
        self.default.clear(prefix)
    }
}
