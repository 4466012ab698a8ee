//! Direct-mapped cache with generation-based invalidation.
//!
//! Each key hashes to exactly one slot and collisions overwrite the previous
//! occupant. Entries are stamped with the generation current at insertion;
//! bumping the generation invalidates everything at once.
//!
//! # Characteristics
//!
//! - **O(1) lookup and insert**: single array access
//! - **O(1) clear**: generation counter
//! - **Selective sweep**: [`DirectMappedCache::retain`] drops entries that
//!   refer to nodes about to be reclaimed

use crate::utils::MyHash;

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    generation: u64,
}

/// A direct-mapped cache of `2^bits` slots.
#[derive(Debug, Clone)]
pub struct DirectMappedCache<K, V> {
    entries: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    generation: u64,
    hits: usize,
    misses: usize,
    faults: usize,
}

impl<K, V> Default for DirectMappedCache<K, V> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K, V> DirectMappedCache<K, V> {
    /// Creates a new cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        let bits = bits.min(30);
        let size = 1usize << bits;
        Self {
            entries: (0..size).map(|_| None).collect(),
            bitmask: (size - 1) as u64,
            generation: 1,
            hits: 0,
            misses: 0,
            faults: 0,
        }
    }

    /// Creates a cache with at least `slots` slots.
    pub fn with_slots(slots: usize) -> Self {
        let bits = slots.max(2).next_power_of_two().trailing_zeros() as usize;
        Self::new(bits)
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Misses caused by a slot holding a different live key.
    pub fn faults(&self) -> usize {
        self.faults
    }

    /// Invalidates every entry. This is O(1).
    pub fn clear(&mut self) {
        self.generation += 1;
    }

    /// Keep only the live entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) {
        let generation = self.generation;
        for slot in &mut self.entries {
            if let Some(e) = slot {
                if e.generation != generation || !keep(&e.key, &e.value) {
                    *slot = None;
                }
            }
        }
    }
}

impl<K, V> DirectMappedCache<K, V>
where
    K: MyHash + Eq,
    V: Copy,
{
    #[inline]
    fn index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }

    #[inline]
    pub fn get(&mut self, key: &K) -> Option<V> {
        let idx = self.index(key);
        match &self.entries[idx] {
            Some(e) if e.generation == self.generation && e.key == *key => {
                self.hits += 1;
                Some(e.value)
            }
            Some(e) if e.generation == self.generation => {
                self.faults += 1;
                self.misses += 1;
                None
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        let idx = self.index(&key);
        self.entries[idx] = Some(Entry {
            key,
            value,
            generation: self.generation,
        });
    }
}
