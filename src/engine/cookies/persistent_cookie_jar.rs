use std::sync::{Arc, RwLock};
use anyhow::Result;
use http::HeaderMap;
use url::Url;

use crate::engine::cookies::cookie_jar::DefaultCookieJar;
use crate::engine::cookies::{Cookie, CookieJar, CookieJarHandle, CookieStoreHandle};

/// A `CookieJar` that persists its state after each mutation.
///
/// Reads are served from memory. Every write is applied to a copy of the jar, the copy is handed
/// to the store, and only when the store accepts it does it become the live state. A failed write
/// therefore leaves the jar exactly as it was.
pub struct PersistentCookieJar {
    inner: DefaultCookieJar,
    store: CookieStoreHandle,
}

impl PersistentCookieJar {
    /// Loads the current state from `store` and wraps it.
    pub fn open(store: CookieStoreHandle) -> Result<Self> {
        let inner = store.load()?;
        Ok(Self { inner, store })
    }

    pub fn into_handle(self) -> CookieJarHandle {
        Arc::new(RwLock::new(self))
    }

    fn mutate(&mut self, f: impl FnOnce(&mut DefaultCookieJar) -> Result<()>) -> Result<()> {
        let mut next = self.inner.clone();
        f(&mut next)?;
        self.store.persist(&next)?;
        self.inner = next;
        Ok(())
    }
}

impl CookieJar for PersistentCookieJar {
    fn set_cookie(&mut self, url: &Url, cookie: Cookie) -> Result<()> {
        self.mutate(|jar| jar.set_cookie(url, cookie))
    }

    fn get_cookie(&self, url: &Url, name: &str) -> Option<Cookie> {
        self.inner.get_cookie(url, name)
    }

    fn cookies_for(&self, url: &Url) -> Vec<Cookie> {
        self.inner.cookies_for(url)
    }

    fn remove_cookie(&mut self, url: &Url, name: &str) -> Result<()> {
        if self.inner.get_cookie(url, name).is_none() {
            return Ok(());
        }
        self.mutate(|jar| jar.remove_cookie(url, name))
    }

    fn clear(&mut self) -> Result<()> {
        self.mutate(|jar| jar.clear())
    }

    fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) -> Result<()> {
        self.mutate(|jar| jar.store_response_cookies(url, headers))
    }

    fn snapshot(&self) -> DefaultCookieJar {
        self.inner.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cookies::CookieStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingStore {
        writes: AtomicUsize,
        fail: AtomicBool,
        last: RwLock<Option<DefaultCookieJar>>,
    }

    impl CookieStore for RecordingStore {
        fn load(&self) -> Result<DefaultCookieJar> {
            Ok(DefaultCookieJar::new())
        }

        fn persist(&self, snapshot: &DefaultCookieJar) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            *self.last.write().unwrap() = Some(snapshot.clone());
            Ok(())
        }
    }

    fn url() -> Url {
        Url::parse("http://localhost/").unwrap()
    }

    #[test]
    fn every_mutation_is_persisted() {
        let store = Arc::new(RecordingStore::default());
        let mut jar = PersistentCookieJar::open(store.clone()).unwrap();

        jar.set_cookie(&url(), Cookie::new("a", "1")).unwrap();
        jar.set_cookie(&url(), Cookie::new("b", "2")).unwrap();
        jar.remove_cookie(&url(), "a").unwrap();
        // removing a missing cookie does not hit the store
        jar.remove_cookie(&url(), "a").unwrap();

        assert_eq!(store.writes.load(Ordering::SeqCst), 3);
        let last = store.last.read().unwrap().clone().unwrap();
        assert_eq!(last, jar.snapshot());
        assert_eq!(last.len(), 1);
    }

    #[test]
    fn failed_persist_leaves_state_untouched() {
        let store = Arc::new(RecordingStore::default());
        let mut jar = PersistentCookieJar::open(store.clone()).unwrap();
        jar.set_cookie(&url(), Cookie::new("a", "1")).unwrap();

        store.fail.store(true, Ordering::SeqCst);
        assert!(jar.set_cookie(&url(), Cookie::new("a", "2")).is_err());
        assert!(jar.clear().is_err());

        assert_eq!(jar.get_cookie(&url(), "a").map(|c| c.value), Some("1".to_string()));
    }
}
