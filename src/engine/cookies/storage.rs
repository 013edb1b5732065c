use anyhow::Result;
use http::HeaderMap;
use url::Url;

use crate::engine::area::{AreaError, StorageArea};
use crate::engine::cookies::{Cookie, CookieJarHandle, DefaultCookieJar};
use crate::engine::name::EngineName;

/// Adapter for the `cookie` engine: every entry is a cookie in a jar, scoped to one URL.
///
/// The engine is supported only when a jar was supplied. Keys are enumerated through the jar's
/// own listing of the cookies that apply to the URL.
pub struct CookieStorage {
    jar: Option<CookieJarHandle>,
    url: Url,
}

impl CookieStorage {
    pub fn new(jar: CookieJarHandle, url: Url) -> Self {
        Self { jar: Some(jar), url }
    }

    /// Cookie storage over a fresh in-memory jar.
    pub fn in_memory(url: Url) -> Self {
        Self::new(DefaultCookieJar::new().into_handle(), url)
    }

    /// Cookie storage without a jar. It reports itself unsupported so the façade falls back.
    pub fn without_jar(url: Url) -> Self {
        log::warn!("Cookie storage for {url} has no cookie jar and will not be used");
        Self { jar: None, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn jar(&self) -> Option<&CookieJarHandle> {
        self.jar.as_ref()
    }

    /// Stores the `Set-Cookie` headers of a response for this storage's URL. Cookies set this
    /// way are readable as storage entries.
    pub fn store_response_cookies(&self, headers: &HeaderMap) -> Result<()> {
        let mut jar = self.require_jar()?.write().map_err(AreaError::from)?;
        jar.store_response_cookies(&self.url, headers)
    }

    /// The `Cookie` request header value for this storage's URL, if any cookie applies.
    pub fn request_cookie_header(&self) -> Result<Option<String>> {
        let jar = self.require_jar()?.read().map_err(AreaError::from)?;
        Ok(jar.get_request_cookies(&self.url))
    }

    fn require_jar(&self) -> Result<&CookieJarHandle, AreaError> {
        self.jar.as_ref().ok_or(AreaError::NoCookieJar)
    }
}

impl StorageArea for CookieStorage {
    fn is_supported(&self) -> bool {
        self.jar.is_some()
    }

    fn fallback_engine(&self) -> Option<EngineName> {
        Some(EngineName::Memory)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let jar = self.require_jar()?.read().map_err(AreaError::from)?;
        Ok(jar.get_cookie(&self.url, key).map(|c| c.value))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let cookie = Cookie {
            same_site: Some("Lax".to_string()),
            ..Cookie::new(key, value).with_path("/")
        };
        let mut jar = self.require_jar()?.write().map_err(AreaError::from)?;
        jar.set_cookie(&self.url, cookie)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut jar = self.require_jar()?.write().map_err(AreaError::from)?;
        jar.remove_cookie(&self.url, key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let jar = self.require_jar()?.read().map_err(AreaError::from)?;
        Ok(jar.cookies_for(&self.url).into_iter().map(|c| c.name).collect())
    }
}
