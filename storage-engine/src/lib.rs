pub mod memory_cache;
pub mod moka_cache;

pub use memory_cache::InMemoryCache;
pub use moka_cache::MokaCache;

use newsdesk::ports::CacheStore;
use shared::config::{CacheBackend, CacheConfig};
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{info, warn};

/// Builds the cache placed underneath the interceptor from configuration
#[derive(Clone, Copy, Debug, Default)]
pub struct StorageFactory;

impl StorageFactory {
    pub fn create_from_config<K, V>(&self, config: &CacheConfig) -> Box<dyn CacheStore<K, V>>
    where
        K: Debug + Hash + Eq + Clone + Send + Sync + 'static,
        V: Debug + Clone + Send + Sync + 'static,
    {
        match config.backend {
            CacheBackend::Moka => {
                info!(
                    capacity = ?config.capacity,
                    ttl = ?config.ttl,
                    "Using moka cache"
                );
                Box::new(MokaCache::new("newsdesk", config.capacity, config.ttl))
            }
            CacheBackend::InMemory => {
                if config.ttl.is_some() {
                    warn!("In-memory cache does not expire entries, ignoring TTL");
                }
                info!(capacity = ?config.capacity, "Using in-memory cache");
                match config.capacity {
                    Some(capacity) => Box::new(InMemoryCache::bounded(
                        usize::try_from(capacity).unwrap_or(usize::MAX),
                    )),
                    None => Box::new(InMemoryCache::unbounded()),
                }
            }
        }
    }
}
