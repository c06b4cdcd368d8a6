//! Route resolution caching
//!
//! Repeated navigations tend to hit a handful of paths. With the `cache`
//! feature enabled the matcher memoizes context-free resolutions (absolute
//! path, no extra params, no redirect involved) in an LRU cache keyed by the
//! raw path string. Entries are tagged with the table revision they were
//! resolved against and the whole cache drops when routes are added.
//!
//! Routes reached through a redirect are never stored: a named redirect
//! target inherits required parameters from the current route, so its result
//! is not a function of the raw path alone. Computed redirects reached
//! through an alias are assumed pure; disable the feature if yours consult
//! external state.

use crate::route::Route;
use crate::trace_log;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Cache performance counters.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    /// Fraction of probes answered from the cache.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache of resolved routes with revision-based invalidation.
#[derive(Debug)]
pub struct RouteCache {
    entries: LruCache<String, Arc<Route>>,
    /// Table revision the entries were resolved against
    revision: u64,
    stats: CacheStats,
}

impl RouteCache {
    const DEFAULT_CAPACITY: usize = 256;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least one");
        Self {
            entries: LruCache::new(capacity),
            revision: 0,
            stats: CacheStats::default(),
        }
    }

    /// Look up a resolution made against the given table revision.
    pub fn get(&mut self, key: &str, revision: u64) -> Option<Arc<Route>> {
        self.invalidate_if_stale(revision);
        match self.entries.get(key) {
            Some(route) => {
                self.stats.hits += 1;
                trace_log!("route cache hit for '{}'", key);
                Some(Arc::clone(route))
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a resolution made against the given table revision.
    pub fn put(&mut self, key: String, route: Arc<Route>, revision: u64) {
        self.invalidate_if_stale(revision);
        self.entries.push(key, route);
    }

    fn invalidate_if_stale(&mut self, revision: u64) {
        if self.revision != revision {
            trace_log!(
                "route cache invalidated (revision {} -> {})",
                self.revision,
                revision
            );
            self.entries.clear();
            self.revision = revision;
            self.stats.invalidations += 1;
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new()
    }
}
