use moka::sync::Cache;
use newsdesk::ports::CacheStore;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

/// Moka-based cache with optional entry bound and TTL
pub struct MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    cache: Cache<K, V>,
}

impl<K, V> MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    /// Create a new unbounded Moka cache with optional default TTL
    pub fn new_unbounded(default_ttl: Option<Duration>) -> Self {
        Self::new("newsdesk", None, default_ttl)
    }

    /// Create a new bounded Moka cache with max entries and optional default TTL
    pub fn new_bounded(max_entries: u64, default_ttl: Option<Duration>) -> Self {
        Self::new("newsdesk", Some(max_entries), default_ttl)
    }

    pub fn new(name: &str, max_entries: Option<u64>, default_ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().name(name);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        if let Some(ttl) = default_ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Applies pending evictions so counts reflect capacity and TTL
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl<K, V> CacheStore<K, V> for MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    fn get(&mut self, key: &K) -> Option<V> {
        // None when absent or TTL expired
        self.cache.get(key)
    }

    fn put(&mut self, key: K, value: V) {
        self.cache.insert(key, value);
    }

    fn remove_by_key(&mut self, key: &K) {
        self.cache.invalidate(key);
    }
}

impl<K, V> Debug for MokaCache<K, V>
where
    K: Debug + Hash + Eq + Send + Sync + 'static,
    V: Debug + Send + Sync + Clone + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCache")
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
