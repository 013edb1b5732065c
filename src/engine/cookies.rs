// src/engine/cookies.rs
//! Cookies: [`CookieJar`], [`CookieStore`], and the [`CookieStorage`] adapter that lets the
//! storage façade keep values in a cookie jar.

mod cookies;
mod cookie_jar;
mod persistent_cookie_jar;
mod storage;
mod store;

pub use cookies::Cookie;
pub use cookies::CookieJarHandle;
pub use cookies::CookieStoreHandle;

pub use cookie_jar::CookieJar;
pub use cookie_jar::DefaultCookieJar;
pub use persistent_cookie_jar::PersistentCookieJar;

pub use storage::CookieStorage;

pub use store::CookieStore;
pub use store::JsonCookieStore;
