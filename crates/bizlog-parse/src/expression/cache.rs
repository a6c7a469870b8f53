//! Bounded cache of compiled templates.

use super::ast::CompiledTemplate;
use super::ExpressionError;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cache entry with access-based expiry
struct CacheEntry {
    template: Arc<CompiledTemplate>,
    last_access: Instant,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful compilations.
    pub compiles: u64,
    pub entries: usize,
}

/// Compiled templates keyed by their exact source text.
///
/// Holds at most `capacity` entries, evicting the least recently used, and
/// drops entries not accessed within `ttl`. Compile failures are not cached.
pub struct ExpressionCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
}

impl ExpressionCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
        }
    }

    /// Return the cached template for `source`, compiling it on a miss.
    ///
    /// Compilation runs outside the lock; two threads missing on the same
    /// source at once may both compile it.
    pub fn get_or_compile<F>(
        &self,
        source: &str,
        compile: F,
    ) -> Result<Arc<CompiledTemplate>, ExpressionError>
    where
        F: FnOnce(&str) -> Result<CompiledTemplate, ExpressionError>,
    {
        if let Some(template) = self.get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(template);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let template = Arc::new(compile(source)?);
        self.compiles.fetch_add(1, Ordering::Relaxed);

        self.entries.lock().put(
            source.to_string(),
            CacheEntry {
                template: Arc::clone(&template),
                last_access: Instant::now(),
            },
        );
        Ok(template)
    }

    fn get(&self, source: &str) -> Option<Arc<CompiledTemplate>> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let expired = match entries.get_mut(source) {
            Some(entry) if now.duration_since(entry.last_access) <= self.ttl => {
                entry.last_access = now;
                return Some(Arc::clone(&entry.template));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(source);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl std::fmt::Debug for ExpressionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionCache")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::compiler::compile;

    fn cache(capacity: usize, ttl: Duration) -> ExpressionCache {
        ExpressionCache::new(NonZeroUsize::new(capacity).unwrap(), ttl)
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let cache = cache(4, Duration::from_secs(60));
        let first = cache.get_or_compile("#{#a}", compile).unwrap();
        let second = cache.get_or_compile("#{#a}", compile).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                compiles: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_keys_are_exact_text() {
        let cache = cache(4, Duration::from_secs(60));
        let a = cache.get_or_compile("#{#a}", compile).unwrap();
        let b = cache.get_or_compile("#{ #a }", compile).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.source(), "#{ #a }");
        assert_eq!(cache.stats().compiles, 2);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = cache(2, Duration::from_secs(60));
        cache.get_or_compile("#{#a}", compile).unwrap();
        cache.get_or_compile("#{#b}", compile).unwrap();
        cache.get_or_compile("#{#a}", compile).unwrap();
        cache.get_or_compile("#{#c}", compile).unwrap();

        assert_eq!(cache.len(), 2);
        cache.get_or_compile("#{#a}", compile).unwrap();
        assert_eq!(cache.stats().compiles, 3);
        cache.get_or_compile("#{#b}", compile).unwrap();
        assert_eq!(cache.stats().compiles, 4);
    }

    #[test]
    fn test_idle_entries_expire() {
        let cache = cache(4, Duration::from_millis(20));
        cache.get_or_compile("#{#a}", compile).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        cache.get_or_compile("#{#a}", compile).unwrap();
        assert_eq!(cache.stats().compiles, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_compile_errors_are_not_cached() {
        let cache = cache(4, Duration::from_secs(60));
        assert!(cache.get_or_compile("#{", compile).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().compiles, 0);
        assert_eq!(cache.stats().misses, 1);
    }
}
