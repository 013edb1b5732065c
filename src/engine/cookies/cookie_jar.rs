//! Cookie jar abstraction and a simple in-memory implementation.
//!
//! A **cookie jar** holds all cookies of one profile. It can be fed from HTTP
//! responses (`Set-Cookie`) and queried for request headers, and it offers the
//! name/value primitives [`CookieStorage`](super::CookieStorage) builds on.
//!
//! [`DefaultCookieJar`] stores cookies **in memory only** and parses a subset of
//! RFC 6265 `Set-Cookie` semantics.
//!
//! ## Notes & limitations
//! - Attributes `Expires`, `Max-Age`, `Path`, `Domain`, `Secure`, `HttpOnly` and
//!   `SameSite` are parsed. `Max-Age <= 0` deletes the cookie; `Expires` is stored
//!   but not enforced.
//! - Cookies are bucketed by **origin** (`url.origin().ascii_serialization()`).
//!   Within a bucket, host/subdomain and path prefix checks are applied.
//! - This module is **not** internally synchronized. Use it via a
//!   `CookieJarHandle = Arc<RwLock<dyn CookieJar + Send + Sync>>`.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use anyhow::Result;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::engine::cookies::{Cookie, CookieJarHandle};

/// A cookie jar keeps the cookies for one profile.
pub trait CookieJar: Send + Sync {
    /// Stores `cookie` for `url`, replacing a cookie with the same name.
    fn set_cookie(&mut self, url: &Url, cookie: Cookie) -> Result<()>;

    /// Returns the cookie called `name` that applies to `url`.
    fn get_cookie(&self, url: &Url, name: &str) -> Option<Cookie>;

    /// Lists every cookie that applies to `url`.
    fn cookies_for(&self, url: &Url) -> Vec<Cookie>;

    /// Removes a single cookie with `name` associated with `url`.
    fn remove_cookie(&mut self, url: &Url, name: &str) -> Result<()>;

    /// Removes all cookies from the jar.
    fn clear(&mut self) -> Result<()>;

    /// Stores cookies found in response `headers` for the given `url`.
    ///
    /// All `Set-Cookie` headers are parsed; names collide with "last write wins".
    fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) -> Result<()>;

    /// Returns the `Cookie` request header value to send for `url`, if any.
    fn get_request_cookies(&self, url: &Url) -> Option<String> {
        let header = self
            .cookies_for(url)
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }

    /// Returns a plain copy of the jar's state, used for persistence.
    fn snapshot(&self) -> DefaultCookieJar;
}

/// Default cookie jar, in memory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultCookieJar {
    /// Cookies bucketed by **origin**.
    ///
    /// Key: origin string from `Url::origin().ascii_serialization()`.
    pub entries: HashMap<String, Vec<Cookie>>,
}

impl DefaultCookieJar {
    /// Creates an empty in-memory cookie jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the jar into a shareable handle.
    pub fn into_handle(self) -> CookieJarHandle {
        Arc::new(RwLock::new(self))
    }

    /// Total number of cookies over all origins.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket(&self, url: &Url) -> Option<&Vec<Cookie>> {
        self.entries.get(&url.origin().ascii_serialization())
    }
}

/// Domain, path and `Secure` checks for `cookie` against `url`.
fn applies_to(cookie: &Cookie, url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();

    let domain_ok = match &cookie.domain {
        Some(domain) => host == domain || host.ends_with(&format!(".{}", domain)),
        None => true,
    };
    let path_ok = match &cookie.path {
        Some(cookie_path) => url.path().starts_with(cookie_path.as_str()),
        None => true,
    };
    let secure_ok = !cookie.secure || url.scheme() == "https";

    domain_ok && path_ok && secure_ok
}

/// Default cookie path derived from the request URL (RFC 6265 5.1.4).
fn default_path(url: &Url) -> &str {
    url.path()
        .rsplit_once('/')
        .map_or("/", |(dir, _)| if dir.is_empty() { "/" } else { dir })
}

fn normalize_same_site(value: &str) -> String {
    if value.eq_ignore_ascii_case("lax") {
        "Lax".to_string()
    } else if value.eq_ignore_ascii_case("strict") {
        "Strict".to_string()
    } else if value.eq_ignore_ascii_case("none") {
        "None".to_string()
    } else {
        value.to_string()
    }
}

/// Parses one `Set-Cookie` header. The flag is `true` when the header expires the cookie.
fn parse_set_cookie(header: &str, default_path: &str) -> Option<(Cookie, bool)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut cookie = Cookie::new(name, value.trim());
    let mut expired = false;

    for part in parts {
        let part = part.trim();
        match part.split_once('=') {
            Some((k, v)) => {
                let v = v.trim();
                match k.trim().to_ascii_lowercase().as_str() {
                    "path" => cookie.path = Some(v.to_string()),
                    "domain" => cookie.domain = Some(v.trim_start_matches('.').to_ascii_lowercase()),
                    "expires" => cookie.expires = Some(v.to_string()),
                    "max-age" => expired = v.parse::<i64>().map_or(false, |secs| secs <= 0),
                    "samesite" => cookie.same_site = Some(normalize_same_site(v)),
                    _ => {}
                }
            }
            None => {
                if part.eq_ignore_ascii_case("secure") {
                    cookie.secure = true;
                } else if part.eq_ignore_ascii_case("httponly") {
                    cookie.http_only = true;
                }
            }
        }
    }

    if cookie.path.is_none() {
        cookie.path = Some(default_path.to_string());
    }

    Some((cookie, expired))
}

impl CookieJar for DefaultCookieJar {
    fn set_cookie(&mut self, url: &Url, cookie: Cookie) -> Result<()> {
        let bucket = self.entries.entry(url.origin().ascii_serialization()).or_default();

        // Replace existing cookie with same name
        if let Some(existing) = bucket.iter_mut().find(|c| c.name == cookie.name) {
            *existing = cookie;
        } else {
            bucket.push(cookie);
        }
        Ok(())
    }

    fn get_cookie(&self, url: &Url, name: &str) -> Option<Cookie> {
        self.bucket(url)?
            .iter()
            .find(|c| c.name == name && applies_to(c, url))
            .cloned()
    }

    fn cookies_for(&self, url: &Url) -> Vec<Cookie> {
        self.bucket(url)
            .map(|cookies| cookies.iter().filter(|c| applies_to(c, url)).cloned().collect())
            .unwrap_or_default()
    }

    fn remove_cookie(&mut self, url: &Url, name: &str) -> Result<()> {
        let origin = url.origin().ascii_serialization();
        if let Some(cookies) = self.entries.get_mut(&origin) {
            cookies.retain(|c| c.name != name);
            if cookies.is_empty() {
                self.entries.remove(&origin);
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    fn store_response_cookies(&mut self, url: &Url, headers: &HeaderMap) -> Result<()> {
        let default_path = default_path(url);

        for header in headers.get_all(http::header::SET_COOKIE) {
            let Ok(header_str) = header.to_str() else {
                log::debug!("Skipping non-ASCII Set-Cookie header for {url}");
                continue;
            };
            let Some((cookie, expired)) = parse_set_cookie(header_str, default_path) else {
                continue;
            };

            if expired {
                self.remove_cookie(url, &cookie.name)?;
            } else {
                self.set_cookie(url, cookie)?;
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> DefaultCookieJar {
        self.clone()
    }
}
