//! Least-recently-used cache of raw sound files.
//!
//! Buffered clips decode from a whole file in memory; loading the same
//! file for every play would thrash the disk, so the engine keeps the
//! most recent files around. Buffers are shared [`Arc`]s: a playing clip
//! holding a buffer pins it, and only buffers nobody else references are
//! eligible for eviction.

use crate::assets::AssetStore;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared raw file contents.
pub type SharedBuffer = Arc<Vec<u8>>;

struct CacheEntry {
    name: String,
    data: SharedBuffer,
    last_used: u64,
}

/// Fixed-capacity LRU cache keyed by asset name.
pub struct SoundCache {
    entries: Mutex<CacheState>,
    capacity: usize,
}

struct CacheState {
    entries: Vec<CacheEntry>,
    clock: u64,
}

impl SoundCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(CacheState {
                entries: Vec::with_capacity(capacity),
                clock: 0,
            }),
            capacity,
        }
    }

    /// Fetch `name` from the cache, loading it through `assets` on a
    /// miss. The returned buffer stays valid for as long as the caller
    /// holds it, even if the entry is evicted meanwhile.
    pub fn get_or_load(&self, name: &str, assets: &dyn AssetStore) -> Result<SharedBuffer> {
        {
            let mut state = self.entries.lock();
            state.clock += 1;
            let now = state.clock;
            if let Some(entry) = state.entries.iter_mut().find(|e| e.name == name) {
                entry.last_used = now;
                tracing::trace!(name, "sound cache hit");
                return Ok(entry.data.clone());
            }
        }

        // load outside the lock; a racing duplicate load is harmless
        let data: SharedBuffer = Arc::new(assets.read(name)?);
        tracing::debug!(name, bytes = data.len(), "sound cache miss, loaded");

        let mut state = self.entries.lock();
        state.clock += 1;
        let now = state.clock;
        if state.entries.len() >= self.capacity {
            // evict the stalest entry no live clip is still holding
            let victim = state
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| Arc::strong_count(&e.data) == 1)
                .min_by_key(|(_, e)| e.last_used)
                .map(|(i, _)| i);
            match victim {
                Some(i) => {
                    let gone = state.entries.swap_remove(i);
                    tracing::trace!(name = %gone.name, "sound cache evicted");
                }
                None => {
                    tracing::debug!("sound cache full of pinned buffers, growing past capacity");
                }
            }
        }
        state.entries.push(CacheEntry {
            name: name.to_string(),
            data: data.clone(),
            last_used: now,
        });
        Ok(data)
    }

    /// Drop every entry. Buffers still held by playing clips stay alive
    /// until those clips finish.
    pub fn clear(&self) {
        self.entries.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemStore;

    fn store_with(names: &[(&str, usize)]) -> MemStore {
        let mut store = MemStore::new();
        for (name, size) in names {
            store.insert(*name, vec![0u8; *size]);
        }
        store
    }

    #[test]
    fn repeated_loads_hit_the_cache() {
        let store = store_with(&[("a.ogg", 10)]);
        let cache = SoundCache::new(4);

        let first = cache.get_or_load("a.ogg", &store).unwrap();
        let second = cache.get_or_load("a.ogg", &store).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn eviction_prefers_least_recently_used() {
        let store = store_with(&[("a", 1), ("b", 1), ("c", 1)]);
        let cache = SoundCache::new(2);

        cache.get_or_load("a", &store).unwrap();
        cache.get_or_load("b", &store).unwrap();
        // touch "a" so "b" becomes the LRU
        cache.get_or_load("a", &store).unwrap();
        cache.get_or_load("c", &store).unwrap();

        assert_eq!(cache.len(), 2);
        let names: Vec<_> = {
            let state = cache.entries.lock();
            state.entries.iter().map(|e| e.name.clone()).collect()
        };
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"c".to_string()));
    }

    #[test]
    fn pinned_buffers_are_not_evicted() {
        let store = store_with(&[("a", 1), ("b", 1), ("c", 1)]);
        let cache = SoundCache::new(2);

        let pinned_a = cache.get_or_load("a", &store).unwrap();
        let pinned_b = cache.get_or_load("b", &store).unwrap();
        cache.get_or_load("c", &store).unwrap();

        // both existing buffers are held, so the cache grew instead
        assert_eq!(cache.len(), 3);
        drop(pinned_a);
        drop(pinned_b);
    }

    #[test]
    fn clear_keeps_held_buffers_alive() {
        let store = store_with(&[("a", 5)]);
        let cache = SoundCache::new(2);

        let held = cache.get_or_load("a", &store).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(held.len(), 5);
    }
}
