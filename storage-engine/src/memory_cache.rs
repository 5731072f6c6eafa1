use newsdesk::ports::CacheStore;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

/// Plain in-memory cache with optional entry bound, oldest insertion evicted first.
///
/// Not synchronized: it relies on the caller for exclusive access.
pub struct InMemoryCache<K, V> {
    entries: HashMap<K, (V, u64)>,
    // Insertion order as (key, generation); stale generations are skipped
    order: VecDeque<(K, u64)>,
    capacity: Option<usize>,
    generation: u64,
}

impl<K, V> InMemoryCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    pub fn bounded(max_entries: usize) -> Self {
        Self::with_capacity(Some(max_entries.max(1)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_overflow(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.entries.len() > capacity {
            let Some((key, generation)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&key).is_some_and(|(_, g)| *g == generation) {
                self.entries.remove(&key);
            }
        }
    }

    fn compact_order(&mut self) {
        if self.order.len() > 2 * self.entries.len() + 16 {
            let entries = &self.entries;
            self.order
                .retain(|(key, generation)| entries.get(key).is_some_and(|(_, g)| g == generation));
        }
    }
}

impl<K, V> CacheStore<K, V> for InMemoryCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn get(&mut self, key: &K) -> Option<V> {
        self.entries.get(key).map(|(value, _)| value.clone())
    }

    fn put(&mut self, key: K, value: V) {
        self.generation += 1;
        self.order.push_back((key.clone(), self.generation));
        self.entries.insert(key, (value, self.generation));
        self.evict_overflow();
        self.compact_order();
    }

    fn remove_by_key(&mut self, key: &K) {
        self.entries.remove(key);
        self.compact_order();
    }
}

impl<K, V> Default for InMemoryCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<K, V> Debug for InMemoryCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("entry_count", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_overwrite() {
        let mut cache = InMemoryCache::unbounded();
        assert_eq!(cache.get(&1), None);

        cache.put(1, "one");
        cache.put(1, "uno");

        assert_eq!(cache.get(&1), Some("uno"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let mut cache: InMemoryCache<u64, &str> = InMemoryCache::unbounded();
        cache.remove_by_key(&9);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_bounded_evicts_oldest_insertion() {
        let mut cache = InMemoryCache::bounded(2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.put(3, "c");

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("b"));
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn test_reinserted_key_counts_as_new() {
        let mut cache = InMemoryCache::bounded(2);
        cache.put(1, "a");
        cache.put(2, "b");
        cache.remove_by_key(&1);
        cache.put(1, "a2");
        cache.put(3, "c");

        // 2 is now the oldest live insertion
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("a2"));
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn test_order_queue_stays_compact() {
        let mut cache = InMemoryCache::unbounded();
        for i in 0..1000u64 {
            cache.put(i % 4, i);
        }
        assert_eq!(cache.len(), 4);
        assert!(cache.order.len() <= 2 * cache.len() + 17);
    }
}
