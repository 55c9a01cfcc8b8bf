//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the capacity, ordering and bookkeeping properties
//! of the object cache over random operation sequences.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::cache::{Lifetime, ManualClock, ObjectCache};
use crate::config::CacheSettings;

// == Test Configuration ==
const TEST_CACHE_SIZE: usize = 100;

fn cache_with_size(cache_size: usize) -> (ObjectCache<String>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let settings = CacheSettings {
        cache_size,
        reset_after: None,
        ..CacheSettings::default()
    };
    (ObjectCache::with_clock(settings, clock.clone()), clock)
}

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e][0-9]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String, compressed: bool },
    Get { key: String },
    Remove { key: String },
    RemoveLike { pattern: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), value_strategy(), any::<bool>())
            .prop_map(|(key, value, compressed)| CacheOp::Set { key, value, compressed }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        1 => "[a-e]".prop_map(|pattern| CacheOp::RemoveLike { pattern }),
    ]
}

/// Reference model: keys ordered oldest → newest.
#[derive(Default)]
struct Model {
    order: VecDeque<String>,
}

impl Model {
    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }

    fn set(&mut self, key: &str, capacity: usize) {
        self.order.retain(|k| k != key);
        while self.order.len() >= capacity {
            self.order.pop_front();
        }
        self.order.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Capacity: after every set the cache holds at most cache_size entries
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..20,
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200)
    ) {
        let (cache, _) = cache_with_size(capacity);

        for (key, value) in entries {
            cache.insert(key, value);
            prop_assert!(
                cache.len() <= capacity,
                "Cache size {} exceeds max {}",
                cache.len(),
                capacity
            );
        }
    }

    // Bijection and ordering: the index always agrees with itself and with a
    // simple promote-on-hit model
    #[test]
    fn prop_matches_reference_model(
        capacity in 1usize..10,
        ops in prop::collection::vec(cache_op_strategy(), 1..150)
    ) {
        let (cache, _) = cache_with_size(capacity);
        let mut model = Model::default();

        for op in ops {
            match op {
                CacheOp::Set { key, value, compressed } => {
                    cache.set(key.clone(), value, Lifetime::Forever, compressed, false);
                    model.set(&key, capacity);
                }
                CacheOp::Get { key } => {
                    let hit = cache.get(&key).is_some();
                    prop_assert_eq!(hit, model.order.contains(&key));
                    if hit {
                        model.touch(&key);
                    }
                }
                CacheOp::Remove { key } => {
                    cache.remove_entry(&key);
                    model.remove(&key);
                }
                CacheOp::RemoveLike { pattern } => {
                    cache.remove_like(&pattern);
                    model.order.retain(|k| !k.contains(&pattern));
                }
            }

            prop_assert!(cache.is_consistent(), "Index maps disagree");
            prop_assert_eq!(cache.keys(), model.keys());
        }
    }

    // Statistics: hits and misses count exactly the lookups that hit or missed
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let (cache, _) = cache_with_size(TEST_CACHE_SIZE);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value, compressed } => {
                    cache.set(key, value, Lifetime::Forever, compressed, false);
                }
                CacheOp::Get { key } => match cache.get(&key) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::Remove { key } => cache.remove_entry(&key),
                CacheOp::RemoveLike { pattern } => {
                    cache.remove_like(&pattern);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
    }

    // Round-trip: a stored value comes back unchanged, compressed or not
    #[test]
    fn prop_roundtrip_storage(
        key in key_strategy(),
        value in value_strategy(),
        compressed in any::<bool>(),
        double_buffer in any::<bool>()
    ) {
        let (cache, _) = cache_with_size(TEST_CACHE_SIZE);

        cache.set(key.clone(), value.clone(), Lifetime::Forever, compressed, double_buffer);
        prop_assert_eq!(cache.get(&key), Some(value));
    }

    // TTL: retrievable strictly before the lifetime elapses, gone at it
    #[test]
    fn prop_ttl_expiration_behavior(
        key in key_strategy(),
        value in value_strategy(),
        ttl in 1u64..10_000,
        before in 0u64..10_000
    ) {
        let before = before % ttl;
        let (cache, clock) = cache_with_size(TEST_CACHE_SIZE);

        cache.set(key.clone(), value.clone(), Lifetime::Seconds(ttl), false, false);

        clock.advance_secs(before as i64);
        prop_assert_eq!(cache.get(&key), Some(value), "Entry should exist before TTL expires");

        clock.advance_secs((ttl - before) as i64);
        prop_assert_eq!(cache.get(&key), None, "Entry should be gone once TTL elapsed");
        prop_assert!(cache.is_consistent());
    }

    // remove_like leaves exactly the keys that don't contain the pattern
    #[test]
    fn prop_remove_like(
        keys in prop::collection::hash_set(key_strategy(), 1..30),
        pattern in "[a-e]"
    ) {
        let (cache, _) = cache_with_size(TEST_CACHE_SIZE);
        for key in &keys {
            cache.insert(key.clone(), key.clone());
        }

        cache.remove_like(&pattern);

        let remaining: HashSet<String> = cache.keys().into_iter().collect();
        let expected: HashSet<String> =
            keys.into_iter().filter(|k| !k.contains(&pattern)).collect();
        prop_assert_eq!(remaining, expected);
    }
}
