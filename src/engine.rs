//! Storage engines.
//!
//! An *engine* is a named backing medium for key/value data. Each engine is implemented by an
//! adapter, a [`StorageArea`], that stores raw strings under raw keys and knows nothing about
//! prefixes or value types.
//!
//! # Built-in engines
//!
//! - **memory**: [`MemoryStorage`]. Always supported, the end of every fallback chain.
//! - **session**: [`SessionStorage`], one map per browsing session kept in a [`SessionStore`].
//!   Falls back to memory.
//! - **local**: [`LocalStorage`] over a [`LocalBackend`](local::LocalBackend) (in-memory, JSON
//!   file or SQLite). Falls back to cookie.
//! - **cookie**: [`CookieStorage`], entries kept as cookies in a
//!   [`CookieJar`](cookies::CookieJar). Falls back to memory.
//!
//! Hosts can register their own adapters under [`EngineName::Custom`].
//!
//! # Resolution
//!
//! The [`EngineRegistry`] maps names to adapters. The [`EngineResolver`] probes each adapter once
//! and substitutes unsupported ones with their fallback, logging a warning when it does.
//!
//! # Example: a persistent local engine
//!
//! ```no_run
//! use std::sync::Arc;
//! use gosub_storage::engine::{EngineName, EngineRegistry, LocalStorage};
//! use gosub_storage::{Storage, StorageConfig};
//!
//! let registry = EngineRegistry::builtin()
//!     .with(EngineName::Local, Arc::new(LocalStorage::json_file("profile/local.json").unwrap()));
//!
//! let storage = Storage::new(StorageConfig::default(), registry).unwrap();
//! let _ = storage.set("greeting", "hello");
//! ```

/// Raw adapter contract.
pub mod area;
/// Cookie jars and the cookie adapter.
pub mod cookies;
/// Durable local storage and its backends.
pub mod local;
/// The always-available memory adapter.
pub mod memory;
/// Engine names.
pub mod name;
/// Capability probing.
pub mod probe;
/// Byte quotas.
pub mod quota;
/// Engine registry and fallback resolution.
pub mod registry;
/// Session-scoped storage.
pub mod session;

pub use area::{AreaError, StorageArea};
pub use cookies::CookieStorage;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use name::{EngineName, ParseEngineNameError};
pub use quota::Quota;
pub use registry::{EngineRegistry, EngineResolver};
pub use session::{SessionId, SessionStore, SessionStorage};
