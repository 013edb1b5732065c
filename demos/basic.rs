use gosub_storage::engine::cookies::{CookieStorage, JsonCookieStore, PersistentCookieJar};
use gosub_storage::engine::{EngineName, EngineRegistry, LocalStorage};
use gosub_storage::{Storage, StorageConfig, StorageEvent};
use http::{HeaderMap, HeaderValue};
use serde_json::json;
use std::sync::Arc;
use url::Url;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let dir = std::env::temp_dir().join("gosub-storage-demo");

    // Cookies are persisted to a JSON file, so values stored in the cookie engine survive a
    // restart of the demo.
    let cookie_store = JsonCookieStore::new(dir.join("cookies.json"));
    let cookie_jar = PersistentCookieJar::open(cookie_store)?.into_handle();
    let cookies = CookieStorage::new(cookie_jar, Url::parse("http://localhost/")?);

    // A server response can set entries too
    let mut headers = HeaderMap::new();
    headers.append(http::header::SET_COOKIE, HeaderValue::from_static("demo.greeting=hello; Path=/"));
    cookies.store_response_cookies(&headers)?;
    println!("Cookie header: {:?}", cookies.request_cookie_header()?);

    // Local storage is disabled here, which simulates a browser in privacy mode. The storage
    // façade will notice this on first use and transparently fall back to the cookie engine.
    let registry = EngineRegistry::builtin()
        .with(EngineName::Local, Arc::new(LocalStorage::in_memory().disable()))
        .with(EngineName::Cookie, Arc::new(cookies));

    let cfg = StorageConfig::builder()
        .prefix("demo")
        .build()?;

    let storage = Storage::new(cfg, registry)?;
    let mut events = storage.subscribe();

    // These go to the default engine (local, which falls back to cookie)
    let _ = storage.set("user", &json!({ "name": "jane", "roles": ["admin"] }));
    let _ = storage.set("visits", &3);
    let _ = storage.set("zip", "1234");
    let _ = storage.set("flag", "true");

    for key in ["user", "visits", "zip", "flag", "greeting", "missing"] {
        println!("local   {key:8} = {}", storage.get(key).into_value());
    }

    // The cookie engine is served by the very same adapter
    let cookie = storage.cookie()?;
    println!("cookie  user     = {}", cookie.get("user").into_value());
    println!("local and cookie share a backend: {}", storage.local()?.shares_backend_with(&cookie));

    // Session storage is a separate medium
    let session = storage.session()?;
    let _ = session.set("tab", "inbox");
    println!("session tab      = {}", session.get("tab").into_value());
    println!("local   tab      = {}", storage.get("tab").into_value());

    storage.clear("")?;
    println!("after clear: user = {}", storage.get("user").into_value());

    while let Ok(ev) = events.try_recv() {
        match ev {
            StorageEvent::Changed { engine, key, new_value, .. } => {
                println!("[event] {engine}: {key} -> {new_value:?}");
            }
            StorageEvent::Cleared { engine, prefix } => println!("[event] {engine}: cleared {prefix:?}"),
            StorageEvent::Fallback { requested, fallback } => {
                println!("[event] {requested} served by {fallback}");
            }
        }
    }

    Ok(())
}
