//! Item read cache.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use stockgrid_core::{Item, ItemId};
use tracing::debug;

/// Invalidation count for one key, read before an upstream fetch.
pub type Generation = u64;

/// Key-value cache of catalog items, keyed by id.
///
/// Implementations must be safe to share across request tasks. No method
/// may hold a lock across an await point.
///
/// A fill is two steps: take the key's [`Generation`] on a miss, then
/// [`put`](ItemCache::put) with it once the upstream read returns. An
/// invalidation that lands between the two bumps the generation, and the
/// stale fill is dropped.
pub trait ItemCache: Send + Sync {
    fn get(&self, id: ItemId) -> Option<Item>;

    fn generation(&self, id: ItemId) -> Generation;

    /// Store `item` unless its id was invalidated after `seen` was taken.
    /// Returns whether the entry was stored.
    fn put(&self, item: Item, seen: Generation) -> bool;

    /// Remove the entry for `id`. Returns whether an entry was present.
    fn invalidate(&self, id: ItemId) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CacheStats;
}

/// Counters since startup, served on `GET /cache/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Fills dropped because an invalidation overtook the read.
    pub stale_fills: u64,
    pub entries: usize,
}

#[derive(Default)]
struct Slots {
    entries: HashMap<ItemId, Item>,
    generations: HashMap<ItemId, Generation>,
}

/// Process-local cache with no eviction other than explicit invalidation.
#[derive(Default)]
pub struct InMemoryCache {
    slots: RwLock<Slots>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_fills: AtomicU64,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemCache for InMemoryCache {
    fn get(&self, id: ItemId) -> Option<Item> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        let found = slots.entries.get(&id).cloned();
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    fn generation(&self, id: ItemId) -> Generation {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.generations.get(&id).copied().unwrap_or_default()
    }

    fn put(&self, item: Item, seen: Generation) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        let current = slots.generations.get(&item.id).copied().unwrap_or_default();
        if current != seen {
            self.stale_fills.fetch_add(1, Ordering::Relaxed);
            debug!(item_id = item.id, seen, current, "stale cache fill dropped");
            return false;
        }
        debug!(item_id = item.id, stock = item.stock, "cache populated");
        slots.entries.insert(item.id, item);
        true
    }

    fn invalidate(&self, id: ItemId) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        *slots.generations.entry(id).or_default() += 1;
        slots.entries.remove(&id).is_some()
    }

    fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.entries.len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_fills: self.stale_fills.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, stock: u64) -> Item {
        Item {
            id,
            title: format!("Book {id}"),
            cost: 10,
            topic: "Distributed Systems".into(),
            stock,
        }
    }

    fn fill(cache: &InMemoryCache, item: Item) -> bool {
        let seen = cache.generation(item.id);
        cache.put(item, seen)
    }

    #[test]
    fn put_then_get() {
        let cache = InMemoryCache::new();
        assert!(cache.get(1).is_none());
        assert!(fill(&cache, item(1, 3)));
        assert_eq!(cache.get(1), Some(item(1, 3)));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                stale_fills: 0,
                entries: 1
            }
        );
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = InMemoryCache::new();
        fill(&cache, item(1, 3));
        fill(&cache, item(1, 2));
        assert_eq!(cache.get(1).map(|i| i.stock), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_is_idempotent() {
        let cache = InMemoryCache::new();
        fill(&cache, item(4, 1));

        assert!(cache.invalidate(4));
        assert!(!cache.invalidate(4));
        assert!(!cache.invalidate(99));
        assert!(cache.is_empty());
        assert!(cache.get(4).is_none());
    }

    #[test]
    fn invalidation_during_fill_drops_the_fill() {
        let cache = InMemoryCache::new();
        let seen = cache.generation(2);

        // Nothing cached yet, but the write still has to win.
        assert!(!cache.invalidate(2));
        assert!(!cache.put(item(2, 5), seen));

        assert!(cache.get(2).is_none());
        assert_eq!(cache.stats().stale_fills, 1);
        assert!(fill(&cache, item(2, 4)), "a fresh fill is accepted");
        assert_eq!(cache.get(2).map(|i| i.stock), Some(4));
    }

    #[test]
    fn generations_are_per_key() {
        let cache = InMemoryCache::new();
        let seen = cache.generation(1);
        cache.invalidate(2);
        assert!(cache.put(item(1, 3), seen));
    }
}
