//! Capacity Index Module
//!
//! Keeps keys, sequence numbers and entries in three maps that always agree.
//! The lowest sequence number is the next eviction candidate; promoting a key
//! moves it to a fresh (highest) sequence number.

use std::collections::{BTreeMap, HashMap};

use crate::cache::CacheEntry;

// == Eviction Slot ==
/// Outcome of popping the oldest sequence slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictedSlot {
    /// The slot resolved to a live key, which is now gone from all maps.
    Key(String),
    /// The slot no longer pointed back at a live key and was discarded.
    Stale,
}

// == Capacity Index ==
#[derive(Debug)]
pub struct CapacityIndex<T> {
    key_to_seq: HashMap<String, u64>,
    seq_to_key: BTreeMap<u64, String>,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> Default for CapacityIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CapacityIndex<T> {
    pub fn new() -> Self {
        Self {
            key_to_seq: HashMap::new(),
            seq_to_key: BTreeMap::new(),
            entries: HashMap::new(),
        }
    }

    // == Insert ==
    /// Admits `key` at sequence `seq`, replacing any previous triple for it.
    pub fn insert(&mut self, key: String, seq: u64, entry: CacheEntry<T>) {
        self.remove(&key);

        // A sequence slot can only be reused after a reset
        if let Some(displaced) = self.seq_to_key.insert(seq, key.clone()) {
            self.key_to_seq.remove(&displaced);
            self.entries.remove(&displaced);
        }
        self.key_to_seq.insert(key.clone(), seq);
        self.entries.insert(key, entry);
    }

    // == Promote ==
    /// Moves `key` to sequence `seq` without touching its entry.
    ///
    /// Returns false if the key is not present.
    pub fn promote(&mut self, key: &str, seq: u64) -> bool {
        let Some(old_seq) = self.key_to_seq.get_mut(key) else {
            return false;
        };
        let previous = std::mem::replace(old_seq, seq);
        self.seq_to_key.remove(&previous);
        self.seq_to_key.insert(seq, key.to_string());
        true
    }

    // == Remove ==
    /// Removes `key` from all three maps.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        if let Some(seq) = self.key_to_seq.remove(key) {
            self.seq_to_key.remove(&seq);
        }
        self.entries.remove(key)
    }

    // == Evict Oldest ==
    /// Pops the lowest sequence slot.
    ///
    /// Returns None if there is nothing left to pop.
    pub fn evict_oldest(&mut self) -> Option<EvictedSlot> {
        let (seq, key) = self.seq_to_key.pop_first()?;

        if self.key_to_seq.get(&key) != Some(&seq) {
            return Some(EvictedSlot::Stale);
        }

        self.key_to_seq.remove(&key);
        if self.entries.remove(&key).is_none() {
            return Some(EvictedSlot::Stale);
        }
        Some(EvictedSlot::Key(key))
    }

    // == Prune ==
    /// Removes every entry matching `dead`, returning how many were removed.
    pub fn prune<F>(&mut self, mut dead: F) -> usize
    where
        F: FnMut(&CacheEntry<T>) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| dead(entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry<T>> {
        self.entries.get_mut(key)
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> Vec<String> {
        self.seq_to_key.values().cloned().collect()
    }

    /// Entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry<T>)> {
        self.entries.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut CacheEntry<T>> {
        self.entries.values_mut()
    }

    pub fn clear(&mut self) {
        self.key_to_seq.clear();
        self.seq_to_key.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Consistency ==
    /// Checks that the three maps form a bijection.
    pub fn is_consistent(&self) -> bool {
        self.key_to_seq.len() == self.seq_to_key.len()
            && self.key_to_seq.len() == self.entries.len()
            && self.key_to_seq.iter().all(|(key, seq)| {
                self.seq_to_key.get(seq) == Some(key) && self.entries.contains_key(key)
            })
    }
}
