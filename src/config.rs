//! Storage configuration.
//!
//! `StorageConfig` selects which engines a [`Storage`](crate::Storage) exposes, which engine the
//! unqualified operations go to, and the prefix that namespaces every key. It is fixed once the
//! façade is built.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_storage::{EngineName, StorageConfig};
//! let cfg = StorageConfig::default();
//! assert_eq!(cfg.default_engine(), &EngineName::Local);
//! assert_eq!(cfg.prefix(), "");
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use gosub_storage::{EngineName, StorageConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = StorageConfig::builder()
//!     .prefix("myapp")
//!     .enabled_engines([EngineName::Session, EngineName::Memory])
//!     .default_engine(EngineName::Session)
//!     .build()?; // returns Result<StorageConfig, ConfigError>
//! assert_eq!(cfg.prefix(), "myapp.");
//! # Ok(()) }
//! ```
//!
//! ## Load from JSON
//! ```rust
//! use gosub_storage::{EngineName, StorageConfig};
//! let cfg: StorageConfig = serde_json::from_str(
//!     r#"{ "prefix": "app", "default_engine": "session" }"#,
//! ).unwrap();
//! assert_eq!(cfg.prefix(), "app.");
//! assert!(cfg.is_enabled(&EngineName::Cookie));
//! ```
//!
//! # Errors
//!
//! Validation returns a [`ConfigError`] when no engine is enabled or the default engine is not
//! one of the enabled engines. [`Storage::new`](crate::Storage::new) additionally rejects enabled
//! engines that have no registered adapter.

use crate::engine::EngineName;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStorageConfig", into = "RawStorageConfig")]
pub struct StorageConfig {
    prefix: String,
    enabled_engines: Vec<EngineName>,
    default_engine: EngineName,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            enabled_engines: EngineName::builtin().to_vec(),
            default_engine: EngineName::Local,
        }
    }
}

impl StorageConfig {
    pub fn builder() -> StorageConfigBuilder {
        StorageConfigBuilder::default()
    }

    /// Key prefix, either empty or ending in `.`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Enabled engines in configuration order, without duplicates.
    pub fn enabled_engines(&self) -> &[EngineName] {
        &self.enabled_engines
    }

    pub fn default_engine(&self) -> &EngineName {
        &self.default_engine
    }

    pub fn is_enabled(&self, engine: &EngineName) -> bool {
        self.enabled_engines.contains(engine)
    }
}

/// Builder for [`StorageConfig`].
#[derive(Debug, Clone, Default)]
pub struct StorageConfigBuilder {
    inner: StorageConfig,
}

impl StorageConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut StorageConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn prefix<S: Into<String>>(self, prefix: S) -> Self {
        self.map(|c| c.prefix = prefix.into())
    }
    pub fn enabled_engines<I: IntoIterator<Item = EngineName>>(self, engines: I) -> Self {
        self.map(|c| c.enabled_engines = engines.into_iter().collect())
    }
    pub fn enable(self, engine: EngineName) -> Self {
        self.map(|c| c.enabled_engines.push(engine))
    }
    pub fn default_engine(self, engine: EngineName) -> Self {
        self.map(|c| c.default_engine = engine)
    }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut StorageConfig)) -> Self {
        self.map(f)
    }

    /// Normalize, validate and build the final config.
    pub fn build(self) -> Result<StorageConfig, ConfigError> {
        let mut cfg = self.inner;
        cfg.prefix = normalize_prefix(cfg.prefix);
        cfg.enabled_engines = dedupe(cfg.enabled_engines);
        validate(&cfg)?;
        Ok(cfg)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    NoEnginesEnabled,
    DefaultEngineNotEnabled(EngineName),
    UnregisteredEngine(EngineName),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoEnginesEnabled => write!(f, "at least one storage engine must be enabled"),
            ConfigError::DefaultEngineNotEnabled(name) => {
                write!(f, "default storage engine '{name}' is not an enabled engine")
            }
            ConfigError::UnregisteredEngine(name) => {
                write!(f, "storage engine '{name}' is enabled but no adapter is registered for it")
            }
        }
    }
}
impl std::error::Error for ConfigError {}

fn validate(c: &StorageConfig) -> Result<(), ConfigError> {
    if c.enabled_engines.is_empty() {
        return Err(ConfigError::NoEnginesEnabled);
    }
    if !c.enabled_engines.contains(&c.default_engine) {
        return Err(ConfigError::DefaultEngineNotEnabled(c.default_engine.clone()));
    }
    Ok(())
}

fn normalize_prefix(prefix: String) -> String {
    if prefix.is_empty() || prefix.ends_with('.') {
        prefix
    } else {
        prefix + "."
    }
}

fn dedupe(engines: Vec<EngineName>) -> Vec<EngineName> {
    let mut out: Vec<EngineName> = Vec::with_capacity(engines.len());
    for engine in engines {
        if !out.contains(&engine) {
            out.push(engine);
        }
    }
    out
}

// ---------- File form ----------

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct RawStorageConfig {
    prefix: String,
    enabled_engines: Vec<EngineName>,
    default_engine: EngineName,
}

impl Default for RawStorageConfig {
    fn default() -> Self {
        StorageConfig::default().into()
    }
}

impl From<StorageConfig> for RawStorageConfig {
    fn from(c: StorageConfig) -> Self {
        Self {
            prefix: c.prefix,
            enabled_engines: c.enabled_engines,
            default_engine: c.default_engine,
        }
    }
}

impl TryFrom<RawStorageConfig> for StorageConfig {
    type Error = ConfigError;

    fn try_from(raw: RawStorageConfig) -> Result<Self, Self::Error> {
        StorageConfig::builder()
            .with(|c| {
                c.prefix = raw.prefix;
                c.enabled_engines = raw.enabled_engines;
                c.default_engine = raw.default_engine;
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = StorageConfig::default();
        assert_eq!(cfg.prefix(), "");
        assert_eq!(
            cfg.enabled_engines(),
            &[EngineName::Local, EngineName::Session, EngineName::Cookie, EngineName::Memory]
        );
        assert_eq!(cfg.default_engine(), &EngineName::Local);
        assert_eq!(StorageConfig::builder().build().unwrap(), cfg);
    }

    #[test]
    fn prefix_is_normalized() {
        let cfg = StorageConfig::builder().prefix("app").build().unwrap();
        assert_eq!(cfg.prefix(), "app.");

        let cfg = StorageConfig::builder().prefix("app.").build().unwrap();
        assert_eq!(cfg.prefix(), "app.");

        let cfg = StorageConfig::builder().prefix("").build().unwrap();
        assert_eq!(cfg.prefix(), "");
    }

    #[test]
    fn duplicate_engines_keep_first_position() {
        let cfg = StorageConfig::builder()
            .enabled_engines([EngineName::Session, EngineName::Memory, EngineName::Session])
            .enable(EngineName::Memory)
            .default_engine(EngineName::Memory)
            .build()
            .unwrap();
        assert_eq!(cfg.enabled_engines(), &[EngineName::Session, EngineName::Memory]);
    }

    #[test]
    fn default_must_be_enabled() {
        let err = StorageConfig::builder()
            .enabled_engines([EngineName::Session, EngineName::Memory])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DefaultEngineNotEnabled(EngineName::Local));
        assert!(err.to_string().contains("'local'"));
    }

    #[test]
    fn empty_engine_list_is_rejected() {
        let err = StorageConfig::builder()
            .with(|c| c.enabled_engines.clear())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::NoEnginesEnabled);
    }

    #[test]
    fn custom_engines_can_be_enabled() {
        let cfg = StorageConfig::builder()
            .enable(EngineName::custom("indexeddb"))
            .default_engine(EngineName::custom("indexeddb"))
            .build()
            .unwrap();
        assert!(cfg.is_enabled(&EngineName::custom("indexeddb")));
        assert!(!cfg.is_enabled(&EngineName::custom("websql")));
    }

    #[test]
    fn deserialize_validates() {
        let cfg: StorageConfig = serde_json::from_str(
            r#"{"prefix":"shop","enabled_engines":["session","memory","session"],"default_engine":"memory"}"#,
        )
        .unwrap();
        assert_eq!(cfg.prefix(), "shop.");
        assert_eq!(cfg.enabled_engines(), &[EngineName::Session, EngineName::Memory]);

        let err = serde_json::from_str::<StorageConfig>(r#"{"enabled_engines":["memory"]}"#).unwrap_err();
        assert!(err.to_string().contains("not an enabled engine"), "{err}");

        let err = serde_json::from_str::<StorageConfig>(r#"{"default_engine":""}"#).unwrap_err();
        assert!(err.is_data());
    }

    #[test]
    fn serialize_round_trips() {
        let cfg = StorageConfig::builder().prefix("x").build().unwrap();
        let text = serde_json::to_string(&cfg).unwrap();
        assert!(text.contains(r#""prefix":"x.""#), "{text}");
        let back: StorageConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
