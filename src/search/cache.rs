use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use lru::LruCache;
use parking_lot::Mutex;
use crate::query::ast::Query;
use crate::search::results::SearchResults;

/// Result cache. Keys carry the snapshot version, so a commit makes every
/// older entry unreachable without an explicit flush.
pub struct QueryCache {
    cache: Option<Mutex<LruCache<QueryKey, SearchResults>>>,   // None when disabled
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub version: u64,
    pub query: Query,
    pub limit: usize,
    pub snippet_text: Option<String>,
}

impl QueryCache {
    /// A capacity of zero disables caching
    pub fn new(capacity: usize) -> Self {
        QueryCache {
            cache: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<SearchResults> {
        let cache = self.cache.as_ref()?;
        match cache.lock().get(key) {
            Some(results) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(results.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: QueryKey, results: SearchResults) {
        if let Some(cache) = &self.cache {
            cache.lock().put(key, results);
        }
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.lock().clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.as_ref().map(|c| c.lock().len()).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(version: u64) -> QueryKey {
        QueryKey { version, query: Query::term("content", "fox"), limit: 10, snippet_text: None }
    }

    #[test]
    fn entries_are_scoped_to_a_version() {
        let cache = QueryCache::new(4);
        cache.put(key(1), SearchResults::empty());

        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        let stats = cache.stats();
        assert_eq!((stats.hit_count, stats.miss_count, stats.size), (1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn zero_capacity_disables_the_cache() {
        let cache = QueryCache::new(0);
        cache.put(key(1), SearchResults::empty());
        assert!(cache.get(&key(1)).is_none());
        assert_eq!(cache.stats().size, 0);
    }
}
