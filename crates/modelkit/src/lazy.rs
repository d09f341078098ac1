//! Lazy-value cache - per-instance memoization with explicit invalidation
//!
//! A `LazyCache` memoizes the result of a zero-argument computation on first
//! access and hands back the stored value on every later read until it is
//! invalidated. Entries are keyed by an enumerated slot type rather than by
//! attribute-name strings, so a typo cannot silently create a new cache
//! entry, and each entry is typed.
//!
//! The cache lives exactly as long as the instance that embeds it. It is
//! `&mut`-only, carries no locking, and is deliberately excluded from
//! serialization and cloning: a deserialized or cloned instance starts with
//! a cold cache and recomputes on the next read.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::error::{ModelError, ModelResult};

/// Enumerated identifier for a cache entry.
///
/// Implement this on a small `Copy` enum, one variant per lazily computed
/// value the owning type has.
pub trait CacheSlot: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Stable identifier used in diagnostics.
    fn name(&self) -> &'static str;
}

/// Per-instance cache of lazily computed, typed values.
pub struct LazyCache<S: CacheSlot> {
    entries: HashMap<S, Box<dyn Any + Send + Sync>>,
}

impl<S: CacheSlot> LazyCache<S> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Return the cached value for `slot`, computing and storing it first if
    /// no entry is present. The computation runs at most once per cache
    /// lifetime unless the slot is invalidated in between.
    pub fn get_or_compute<T, F>(&mut self, slot: S, compute: F) -> ModelResult<&T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> ModelResult<T>,
    {
        let entry = match self.entries.entry(slot) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(Box::new(compute()?)),
        };

        entry.downcast_ref::<T>().ok_or_else(|| {
            ModelError::validation(format!(
                "lazy slot '{}' holds a value of a different type",
                slot.name()
            ))
        })
    }

    /// Remove one cached entry. Absence is not an error.
    pub fn invalidate(&mut self, slot: S) {
        if self.entries.remove(&slot).is_some() {
            tracing::trace!(slot = slot.name(), "invalidated lazy entry");
        }
    }

    /// Remove every cached entry currently present.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, slot: S) -> bool {
        self.entries.contains_key(&slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: CacheSlot> Default for LazyCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

// A clone starts with a cold cache and recomputes on first read.
impl<S: CacheSlot> Clone for LazyCache<S> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<S: CacheSlot> fmt::Debug for LazyCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<&'static str> = self.entries.keys().map(|s| s.name()).collect();
        f.debug_struct("LazyCache").field("slots", &slots).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum ReportSlot {
        Summary,
        Totals,
    }

    impl CacheSlot for ReportSlot {
        fn name(&self) -> &'static str {
            match self {
                ReportSlot::Summary => "summary",
                ReportSlot::Totals => "totals",
            }
        }
    }

    #[test]
    fn test_computes_once_and_caches() {
        let mut cache = LazyCache::new();
        let mut calls = 0;

        let first = cache
            .get_or_compute(ReportSlot::Summary, || {
                calls += 1;
                Ok("expensive".to_string())
            })
            .unwrap()
            .clone();

        let second = cache
            .get_or_compute(ReportSlot::Summary, || -> ModelResult<String> {
                panic!("must not recompute a cached slot")
            })
            .unwrap()
            .clone();

        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert!(cache.contains(ReportSlot::Summary));
    }

    #[test]
    fn test_invalidate_triggers_recomputation() {
        let mut cache = LazyCache::new();
        let mut calls = 0;
        let mut read = |cache: &mut LazyCache<ReportSlot>, calls: &mut u32| {
            *cache
                .get_or_compute(ReportSlot::Totals, || {
                    *calls += 1;
                    Ok(*calls)
                })
                .unwrap()
        };

        assert_eq!(read(&mut cache, &mut calls), 1);
        cache.invalidate(ReportSlot::Totals);
        assert_eq!(read(&mut cache, &mut calls), 2);
    }

    #[test]
    fn test_invalidate_absent_slot_is_noop() {
        let mut cache: LazyCache<ReportSlot> = LazyCache::new();
        cache.invalidate(ReportSlot::Summary);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all_clears_every_entry() {
        let mut cache = LazyCache::new();
        cache
            .get_or_compute(ReportSlot::Summary, || Ok(1u64))
            .unwrap();
        cache
            .get_or_compute(ReportSlot::Totals, || Ok(2u64))
            .unwrap();
        assert_eq!(cache.len(), 2);

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert!(!cache.contains(ReportSlot::Summary));
    }

    #[test]
    fn test_type_mismatch_is_a_validation_error() {
        let mut cache = LazyCache::new();
        cache
            .get_or_compute(ReportSlot::Summary, || Ok(42u64))
            .unwrap();

        let result = cache.get_or_compute(ReportSlot::Summary, || Ok("oops".to_string()));
        assert!(matches!(result, Err(ModelError::Validation(_))));
    }

    #[test]
    fn test_clone_starts_cold() {
        let mut cache = LazyCache::new();
        cache
            .get_or_compute(ReportSlot::Summary, || Ok(7i64))
            .unwrap();

        let cloned = cache.clone();
        assert!(cloned.is_empty());
        assert!(cache.contains(ReportSlot::Summary));
    }
}
