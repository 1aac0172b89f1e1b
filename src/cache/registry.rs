//! Cache registry - Central management for all caches.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{CacheConfig, TypedCache};

/// Registry key: a cache is identified by its name *and* its key/value types,
/// so two components can never observe the same cache under different types.
type RegistryKey = (String, TypeId);

/// Central registry for named typed caches.
///
/// Repositories ask the registry for their cache by name; asking twice returns
/// the same underlying cache.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<RegistryKey, Box<dyn Any + Send + Sync>>>>,
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an existing cache by name.
    #[cfg(test)]
    pub fn get<K, V>(&self, name: &str) -> Option<TypedCache<K, V>>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let key = (name.to_string(), TypeId::of::<TypedCache<K, V>>());
        self.caches
            .read()
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<TypedCache<K, V>>())
            .cloned()
    }

    /// Get an existing cache or create and register a new one.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let key = (name.to_string(), TypeId::of::<TypedCache<K, V>>());
        let mut caches = self.caches.write();

        if let Some(existing) = caches
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<TypedCache<K, V>>())
        {
            return existing.clone();
        }

        debug!("Creating cache: {}", name);
        let cache = TypedCache::new(name, config);
        caches.insert(key, Box::new(cache.clone()));
        cache
    }

    /// Get the number of registered caches.
    pub fn len(&self) -> usize {
        self.caches.read().len()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field(
                "cache_names",
                &caches.keys().map(|(name, _)| name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
