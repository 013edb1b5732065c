//! Cookie store infrastructure.
//!
//! A **cookie store** is the persistence layer behind a [`PersistentCookieJar`](super::PersistentCookieJar):
//! it loads the jar's state once and accepts a full snapshot after every mutation.
//!
//! This module exports one reference implementation, [`JsonCookieStore`], a file-backed JSON
//! store suitable for simple setups.
//!
//! ## Example
//! ```rust,no_run
//! use gosub_storage::engine::cookies::{CookieStorage, JsonCookieStore, PersistentCookieJar};
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = JsonCookieStore::new("cookies.json".into());
//! let jar = PersistentCookieJar::open(store)?.into_handle();
//! let cookies = CookieStorage::new(jar, url::Url::parse("https://example.com/")?);
//! # Ok(()) }
//! ```
mod json;

use anyhow::Result;
use crate::engine::cookies::cookie_jar::DefaultCookieJar;

/// File-backed JSON cookie store.
pub use json::JsonCookieStore;

/// Persists cookie jar snapshots.
///
/// Implementations must be `Send + Sync` and safe for concurrent use.
pub trait CookieStore: Send + Sync {
    /// Loads the persisted jar. A store without data returns an empty jar.
    fn load(&self) -> Result<DefaultCookieJar>;

    /// Replaces the persisted state with `snapshot`.
    fn persist(&self, snapshot: &DefaultCookieJar) -> Result<()>;
}
