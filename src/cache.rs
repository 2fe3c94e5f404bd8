//! Identifier cache - generation based approximate LRU
//!
//! Memoizes key → surrogate id lookups. Every call bumps a generation
//! counter; entries remember the generation they were last touched at.
//! Every `2 * threshold` calls the cache is trimmed back to the `threshold`
//! most recently touched entries. Between trims the cache may grow past
//! `threshold`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Number of entries kept after a trim when nothing else is configured
pub const DEFAULT_TRIM_THRESHOLD: usize = 512;

#[derive(Debug, Clone, Copy)]
struct CacheEntry<V> {
    generation: u64,
    value: V,
}

/// Batched, approximate LRU cache for identifier resolution.
#[derive(Debug)]
pub struct IdentifierCache<K, V> {
    generation: u64,
    threshold: usize,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Hash + Eq, V: Copy> IdentifierCache<K, V> {
    pub fn new(threshold: usize) -> Self {
        assert!(threshold > 0, "cache threshold must be positive");
        Self {
            generation: 0,
            threshold,
            entries: HashMap::new(),
        }
    }

    /// Look up `key`, computing and caching the value on a miss.
    ///
    /// `compute` returning `Ok(None)` means the key does not exist; that
    /// answer is passed through and never cached. Errors from `compute`
    /// propagate unchanged.
    pub fn get_value<Q, E, F>(&mut self, key: &Q, compute: F) -> Result<Option<V>, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(&Q) -> Result<Option<V>, E>,
    {
        let tick = self.generation;
        self.generation += 1;
        if tick % (2 * self.threshold as u64) == 0 {
            self.trim();
        }

        let generation = self.generation;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.generation = generation;
            return Ok(Some(entry.value));
        }

        let Some(value) = compute(key)? else {
            return Ok(None);
        };
        self.entries.insert(key.to_owned(), CacheEntry { generation, value });
        Ok(Some(value))
    }

    /// Drop entries until only the `threshold` most recent ones are left.
    fn trim(&mut self) {
        if self.entries.len() <= self.threshold {
            return;
        }

        // Generations are unique per entry, so the cutoff keeps exactly
        // `threshold` entries.
        let mut generations: Vec<u64> = self.entries.values().map(|e| e.generation).collect();
        let (_, cutoff, _) = generations.select_nth_unstable_by(self.threshold - 1, |a, b| b.cmp(a));
        let cutoff = *cutoff;

        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.generation >= cutoff);
        tracing::debug!(
            evicted = before - self.entries.len(),
            kept = self.entries.len(),
            "trimmed identifier cache"
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check for a cached key without touching its generation
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Forget every cached value
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Hash + Eq, V: Copy> Default for IdentifierCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_TRIM_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn lookup(cache: &mut IdentifierCache<String, i64>, key: &str, computed: &mut usize) -> Option<i64> {
        cache
            .get_value(key, |k: &str| {
                *computed += 1;
                Ok::<_, Infallible>(k.strip_prefix('k').and_then(|n| n.parse().ok()))
            })
            .unwrap()
    }

    #[test]
    fn test_hit_does_not_recompute() {
        let mut cache = IdentifierCache::new(4);
        let mut computed = 0;

        assert_eq!(lookup(&mut cache, "k1", &mut computed), Some(1));
        assert_eq!(lookup(&mut cache, "k1", &mut computed), Some(1));
        assert_eq!(computed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_not_found_is_not_cached() {
        let mut cache = IdentifierCache::new(4);
        let mut computed = 0;

        assert_eq!(lookup(&mut cache, "missing", &mut computed), None);
        assert_eq!(lookup(&mut cache, "missing", &mut computed), None);
        assert_eq!(computed, 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_propagate() {
        let mut cache: IdentifierCache<String, i64> = IdentifierCache::new(4);
        let result = cache.get_value("k1", |_| Err("backend down"));
        assert_eq!(result, Err("backend down"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_no_eviction_between_trims() {
        let mut cache = IdentifierCache::new(2);
        let mut computed = 0;

        // calls 1..=3: the trim at call 1 saw an empty cache
        for i in 0..3 {
            lookup(&mut cache, &format!("k{}", i), &mut computed);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_trim_keeps_most_recent() {
        let mut cache = IdentifierCache::new(2);
        let mut computed = 0;

        lookup(&mut cache, "k0", &mut computed); // call 1, generation 1
        lookup(&mut cache, "k1", &mut computed); // call 2
        lookup(&mut cache, "k2", &mut computed); // call 3
        lookup(&mut cache, "k0", &mut computed); // call 4, k0 touched again
        assert_eq!(cache.len(), 3);

        // call 5 trims first: k0 (gen 4) and k2 (gen 3) survive
        lookup(&mut cache, "k2", &mut computed);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains_key("k0"));
        assert!(cache.contains_key("k2"));
        assert!(!cache.contains_key("k1"));

        // the evicted key costs exactly one recomputation
        let before = computed;
        lookup(&mut cache, "k1", &mut computed);
        lookup(&mut cache, "k1", &mut computed);
        assert_eq!(computed, before + 1);
    }

    #[test]
    fn test_trim_at_default_threshold() {
        let mut cache = IdentifierCache::new(DEFAULT_TRIM_THRESHOLD);
        let mut computed = 0;

        // calls 1..=600: unique misses
        for i in 0..600 {
            lookup(&mut cache, &format!("k{}", i), &mut computed);
        }
        assert_eq!(cache.len(), 600);

        // calls 601..=1024: keep touching the newest key
        for _ in 600..1024 {
            lookup(&mut cache, "k599", &mut computed);
        }
        assert_eq!(cache.len(), 600);

        // call 1025 crosses the trim boundary
        lookup(&mut cache, "k599", &mut computed);
        assert_eq!(cache.len(), 512);
        assert!(!cache.contains_key("k87"));
        assert!(cache.contains_key("k88"));
        assert!(cache.contains_key("k598"));
        assert_eq!(computed, 600);
    }
}
