//! A unified key/value storage façade over memory, session, local and cookie engines.
//!
//! Start with [`Storage::with_defaults`] or build a [`StorageConfig`] and an
//! [`EngineRegistry`] and call [`Storage::new`].

pub mod codec;
pub mod config;
pub mod engine;
pub mod errors;
pub mod event;
pub mod storage;

pub use config::{ConfigError, StorageConfig, StorageConfigBuilder};
pub use engine::{EngineName, EngineRegistry, StorageArea};
pub use errors::StorageError;
pub use event::{StorageEvent, Subscription};
pub use storage::{EngineStorage, Outcome, Storage};
