//! Engine registry and resolution.
//!
//! The [`EngineRegistry`] maps every [`EngineName`] to the adapter that implements it. The
//! [`EngineResolver`] turns a name into a *working* adapter: the registered one when it is
//! supported, otherwise whatever its fallback chain resolves to. Results are memoized for the
//! lifetime of the resolver, so each engine is probed at most once and repeated lookups return
//! the very same adapter.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use url::Url;

use crate::engine::area::StorageArea;
use crate::engine::cookies::CookieStorage;
use crate::engine::local::LocalStorage;
use crate::engine::memory::MemoryStorage;
use crate::engine::name::EngineName;
use crate::engine::session::SessionStorage;
use crate::errors::StorageError;
use crate::event::{StorageBus, StorageEvent};

/// URL the built-in cookie engine scopes its cookies to.
pub const DEFAULT_COOKIE_URL: &str = "http://localhost/";

/// Adapters by engine name. Always contains a memory adapter.
#[derive(Clone)]
pub struct EngineRegistry {
    areas: HashMap<EngineName, Arc<dyn StorageArea>>,
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRegistry {
    /// A registry with only the memory engine.
    pub fn new() -> Self {
        let mut areas: HashMap<EngineName, Arc<dyn StorageArea>> = HashMap::new();
        areas.insert(EngineName::Memory, Arc::new(MemoryStorage::new()));
        Self { areas }
    }

    /// A registry with all four built-in engines on ephemeral backends: a fresh session,
    /// in-memory local storage and an in-memory cookie jar for [`DEFAULT_COOKIE_URL`].
    pub fn builtin() -> Self {
        let registry = Self::new()
            .with(EngineName::Session, Arc::new(SessionStorage::new()))
            .with(EngineName::Local, Arc::new(LocalStorage::in_memory()));

        match Url::parse(DEFAULT_COOKIE_URL) {
            Ok(url) => registry.with(EngineName::Cookie, Arc::new(CookieStorage::in_memory(url))),
            Err(e) => {
                log::error!("Cannot scope cookie engine to {DEFAULT_COOKIE_URL}: {e}");
                registry
            }
        }
    }

    /// Registers `area` under `name`, returning the adapter it replaces.
    pub fn register(&mut self, name: EngineName, area: Arc<dyn StorageArea>) -> Option<Arc<dyn StorageArea>> {
        self.areas.insert(name, area)
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, name: EngineName, area: Arc<dyn StorageArea>) -> Self {
        self.register(name, area);
        self
    }

    pub fn contains(&self, name: &EngineName) -> bool {
        self.areas.contains_key(name)
    }

    pub fn get(&self, name: &EngineName) -> Option<Arc<dyn StorageArea>> {
        self.areas.get(name).cloned()
    }

    /// Registered engine names, sorted.
    pub fn names(&self) -> Vec<EngineName> {
        let mut names: Vec<_> = self.areas.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Memoizing resolver over a registry.
pub struct EngineResolver {
    registry: EngineRegistry,
    resolved: Mutex<HashMap<EngineName, Arc<dyn StorageArea>>>,
    bus: Arc<StorageBus>,
}

impl EngineResolver {
    pub(crate) fn new(registry: EngineRegistry, bus: Arc<StorageBus>) -> Self {
        Self {
            registry,
            resolved: Mutex::new(HashMap::new()),
            bus,
        }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Returns `true` when `name` has already been resolved.
    pub fn is_resolved(&self, name: &EngineName) -> bool {
        self.resolved
            .lock()
            .map(|resolved| resolved.contains_key(name))
            .unwrap_or(false)
    }

    /// Resolves `name` to a working adapter.
    ///
    /// Unsupported engines are replaced by their declared fallback (memory when they declare
    /// none), repeatedly, until a supported engine is found. Memory is never probed. Every name
    /// along the chain is cached with the final adapter. A fallback that would revisit an engine
    /// already on the chain is redirected to memory.
    pub fn resolve(&self, name: &EngineName) -> Result<Arc<dyn StorageArea>, StorageError> {
        // Held for the whole resolution so concurrent callers never probe twice
        let mut resolved = self.resolved.lock().map_err(|_| StorageError::Poisoned)?;
        if let Some(area) = resolved.get(name) {
            return Ok(area.clone());
        }

        let mut chain: Vec<EngineName> = Vec::new();
        let mut substitutions: Vec<(EngineName, EngineName)> = Vec::new();
        let mut visited: HashSet<EngineName> = HashSet::new();
        let mut current = name.clone();

        let area = loop {
            if let Some(area) = resolved.get(&current) {
                break area.clone();
            }

            let area = self
                .registry
                .get(&current)
                .ok_or_else(|| StorageError::UnknownEngine(current.clone()))?;
            visited.insert(current.clone());

            if current == EngineName::Memory || area.is_supported() {
                log::debug!("Storage engine {current} resolved");
                resolved.insert(current.clone(), area.clone());
                break area;
            }

            let mut fallback = area.fallback_engine().unwrap_or(EngineName::Memory);
            if visited.contains(&fallback) {
                log::warn!(
                    "Storage engine {current} falls back to {fallback}, which is already on the fallback chain. Using memory instead."
                );
                fallback = EngineName::Memory;
            }

            substitutions.push((current.clone(), fallback.clone()));
            chain.push(current);
            current = fallback;
        };

        for name in chain {
            resolved.insert(name, area.clone());
        }
        // Only reported once the whole chain resolved
        for (requested, fallback) in substitutions {
            log::warn!("Storage engine {requested} not supported. Using fallback engine {fallback} instead.");
            self.bus.publish(StorageEvent::Fallback { requested, fallback });
        }
        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::area::AreaError;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter with a fixed support answer that counts how often support was checked.
    struct SupportCounter {
        supported: bool,
        fallback: Option<EngineName>,
        checks: AtomicUsize,
    }

    impl SupportCounter {
        fn new(supported: bool, fallback: Option<EngineName>) -> Arc<Self> {
            Arc::new(Self {
                supported,
                fallback,
                checks: AtomicUsize::new(0),
            })
        }
    }

    impl StorageArea for SupportCounter {
        fn is_supported(&self) -> bool {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.supported
        }
        fn fallback_engine(&self) -> Option<EngineName> {
            self.fallback.clone()
        }
        fn get_item(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AreaError::Disabled.into())
        }
        fn remove_item(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        fn keys(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn same(a: &Arc<dyn StorageArea>, b: &Arc<dyn StorageArea>) -> bool {
        Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
    }

    fn resolver(registry: EngineRegistry) -> EngineResolver {
        EngineResolver::new(registry, Arc::new(StorageBus::default()))
    }

    #[test]
    fn new_registry_only_has_memory() {
        let registry = EngineRegistry::new();
        assert_eq!(registry.names(), vec![EngineName::Memory]);
    }

    #[test]
    fn builtin_registry_has_all_engines() {
        let registry = EngineRegistry::builtin();
        for name in EngineName::builtin() {
            assert!(registry.contains(&name), "{name} missing");
        }
    }

    #[test]
    fn supported_engine_resolves_to_itself() {
        let registry = EngineRegistry::builtin();
        let local = registry.get(&EngineName::Local).unwrap();
        let resolver = resolver(registry);

        let resolved = resolver.resolve(&EngineName::Local).unwrap();
        assert!(same(&resolved, &local));
        assert!(resolver.is_resolved(&EngineName::Local));
        assert!(!resolver.is_resolved(&EngineName::Session));
    }

    #[test]
    fn unsupported_engine_is_checked_once_and_cached() {
        let flaky = SupportCounter::new(false, None);
        let registry = EngineRegistry::new().with(EngineName::custom("flaky"), flaky.clone());
        let memory = registry.get(&EngineName::Memory).unwrap();
        let resolver = resolver(registry);

        let first = resolver.resolve(&EngineName::custom("flaky")).unwrap();
        let second = resolver.resolve(&EngineName::custom("flaky")).unwrap();

        assert!(same(&first, &second));
        assert!(same(&first, &memory));
        assert_eq!(flaky.checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn follows_declared_fallbacks_and_caches_the_whole_chain() {
        let local = SupportCounter::new(false, Some(EngineName::Cookie));
        let cookie = SupportCounter::new(false, Some(EngineName::Session));
        let session = SupportCounter::new(true, None);
        let registry = EngineRegistry::new()
            .with(EngineName::Local, local.clone())
            .with(EngineName::Cookie, cookie.clone())
            .with(EngineName::Session, session.clone());
        let session_area = registry.get(&EngineName::Session).unwrap();
        let resolver = resolver(registry);

        let resolved = resolver.resolve(&EngineName::Local).unwrap();
        assert!(same(&resolved, &session_area));

        // intermediate engines are cached too, nothing is probed again
        let cookie_resolved = resolver.resolve(&EngineName::Cookie).unwrap();
        assert!(same(&cookie_resolved, &session_area));
        resolver.resolve(&EngineName::Session).unwrap();
        assert_eq!(local.checks.load(Ordering::SeqCst), 1);
        assert_eq!(cookie.checks.load(Ordering::SeqCst), 1);
        assert_eq!(session.checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cyclic_fallbacks_end_in_memory() {
        let a = SupportCounter::new(false, Some(EngineName::custom("b")));
        let b = SupportCounter::new(false, Some(EngineName::custom("a")));
        let registry = EngineRegistry::new()
            .with(EngineName::custom("a"), a)
            .with(EngineName::custom("b"), b);
        let memory = registry.get(&EngineName::Memory).unwrap();
        let resolver = resolver(registry);

        let resolved = resolver.resolve(&EngineName::custom("a")).unwrap();
        assert!(same(&resolved, &memory));
    }

    #[test]
    fn memory_support_is_never_checked() {
        let memory = SupportCounter::new(false, None);
        let registry = EngineRegistry::new().with(EngineName::Memory, memory.clone());
        let resolver = resolver(registry);

        resolver.resolve(&EngineName::Memory).unwrap();
        assert_eq!(memory.checks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregistered_fallback_is_an_error() {
        let orphan = SupportCounter::new(false, Some(EngineName::custom("nowhere")));
        let resolver = resolver(EngineRegistry::new().with(EngineName::custom("orphan"), orphan));

        match resolver.resolve(&EngineName::custom("orphan")) {
            Err(StorageError::UnknownEngine(name)) => assert_eq!(name, EngineName::custom("nowhere")),
            Err(other) => panic!("expected UnknownEngine, got {other}"),
            Ok(_) => panic!("expected UnknownEngine, got an adapter"),
        }
    }

    #[test]
    fn failed_resolution_reports_no_fallback() {
        let bus = Arc::new(StorageBus::default());
        let mut rx = bus.subscribe();
        let orphan = SupportCounter::new(false, Some(EngineName::custom("nowhere")));
        let resolver = EngineResolver::new(EngineRegistry::new().with(EngineName::custom("orphan"), orphan), bus);

        assert!(resolver.resolve(&EngineName::custom("orphan")).is_err());
        assert!(rx.try_recv().is_err());
        assert!(!resolver.is_resolved(&EngineName::custom("orphan")));
    }

    #[test]
    fn chained_fallbacks_are_published_in_order() {
        let bus = Arc::new(StorageBus::default());
        let mut rx = bus.subscribe();
        let registry = EngineRegistry::new()
            .with(EngineName::Local, SupportCounter::new(false, Some(EngineName::Cookie)))
            .with(EngineName::Cookie, SupportCounter::new(false, None));
        let resolver = EngineResolver::new(registry, bus);

        resolver.resolve(&EngineName::Local).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            StorageEvent::Fallback { requested: EngineName::Local, fallback: EngineName::Cookie }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StorageEvent::Fallback { requested: EngineName::Cookie, fallback: EngineName::Memory }
        );
    }

    #[test]
    fn memory_spelled_as_custom_name_is_the_memory_engine() {
        let memory = SupportCounter::new(false, None);
        let registry = EngineRegistry::new().with(EngineName::Custom("Memory".into()), memory.clone());
        assert_eq!(registry.names(), vec![EngineName::Memory]);
        let memory_area = registry.get(&EngineName::Memory).unwrap();
        let resolver = resolver(registry);

        let resolved = resolver.resolve(&EngineName::Custom("memory".into())).unwrap();
        assert!(same(&resolved, &memory_area));
        assert_eq!(memory.checks.load(Ordering::SeqCst), 0);
        assert!(resolver.is_resolved(&EngineName::Memory));
    }

    #[test]
    fn fallback_is_published() {
        let bus = Arc::new(StorageBus::default());
        let mut rx = bus.subscribe();
        let registry = EngineRegistry::builtin()
            .with(EngineName::Local, Arc::new(LocalStorage::in_memory().disable()));
        let resolver = EngineResolver::new(registry, bus);

        resolver.resolve(&EngineName::Local).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            StorageEvent::Fallback {
                requested: EngineName::Local,
                fallback: EngineName::Cookie,
            }
        );
    }
}
