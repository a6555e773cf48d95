//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache's structural invariants over arbitrary
//! operation sequences.

use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{Cache, CacheStore, ExpirationHeap};

// == Test Configuration ==
const TEST_CAPACITY: usize = 8;

// == Strategies ==
/// Small key space so that updates, hits and evictions all happen often
fn key_strategy() -> impl Strategy<Value = u8> {
    0u8..24
}

/// TTL in milliseconds; zero means no expiration
fn ttl_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), 1u64..200]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: u8, value: u32 },
    SetWithTtl { key: u8, value: u32, ttl_ms: u64 },
    Get { key: u8 },
    Delete { key: u8 },
    SetCapacity { capacity: usize },
    Advance { ms: u64 },
    Sweep,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        (key_strategy(), any::<u32>(), ttl_strategy())
            .prop_map(|(key, value, ttl_ms)| CacheOp::SetWithTtl { key, value, ttl_ms }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (1usize..12).prop_map(|capacity| CacheOp::SetCapacity { capacity }),
        (0u64..120).prop_map(|ms| CacheOp::Advance { ms }),
        Just(CacheOp::Sweep),
    ]
}

fn apply(store: &mut CacheStore<u8, u32>, op: &CacheOp, now: &mut Instant) {
    match *op {
        CacheOp::Set { key, value } => {
            store.set(key, value, Duration::ZERO, *now);
        }
        CacheOp::SetWithTtl { key, value, ttl_ms } => {
            store.set(key, value, Duration::from_millis(ttl_ms), *now);
        }
        CacheOp::Get { key } => {
            store.get(&key, *now);
        }
        CacheOp::Delete { key } => {
            store.delete(&key);
        }
        CacheOp::SetCapacity { capacity } => {
            store.set_capacity(capacity).unwrap();
        }
        CacheOp::Advance { ms } => {
            *now += Duration::from_millis(ms);
        }
        CacheOp::Sweep => {
            store.sweep_expired(*now);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Capacity invariant: size never exceeds capacity after a completed call,
    // and the lookup table always agrees with the recency list.
    #[test]
    fn prop_capacity_and_index_consistency(ops in prop::collection::vec(cache_op_strategy(), 1..150)) {
        let mut now = Instant::now();
        let mut store = CacheStore::new(TEST_CAPACITY).unwrap();

        for op in &ops {
            apply(&mut store, op, &mut now);

            let keys = store.keys();
            prop_assert!(
                store.len() <= store.capacity(),
                "Cache size {} exceeds capacity {}",
                store.len(),
                store.capacity()
            );
            prop_assert_eq!(keys.len(), store.len());
            let unique: HashSet<_> = keys.iter().collect();
            prop_assert_eq!(unique.len(), keys.len(), "Duplicate key in recency list");
        }
    }

    // After a full sweep no remaining entry is due, and the next live deadline
    // lies in the future.
    #[test]
    fn prop_sweep_leaves_no_due_entries(ops in prop::collection::vec(cache_op_strategy(), 1..150)) {
        let mut now = Instant::now();
        let mut store = CacheStore::new(TEST_CAPACITY).unwrap();

        for op in &ops {
            apply(&mut store, op, &mut now);
        }
        store.sweep_expired(now);

        if let Some(deadline) = store.next_deadline() {
            prop_assert!(deadline > now, "Due record survived a sweep");
        }
        for key in store.keys() {
            prop_assert!(store.get(&key, now).is_some(), "Key {} expired after sweep", key);
        }
    }

    // Model check of recency order against a plain deque, without TTLs.
    #[test]
    fn prop_lru_matches_model(
        ops in prop::collection::vec((key_strategy(), any::<bool>()), 1..200),
        capacity in 1usize..10
    ) {
        let now = Instant::now();
        let mut store = CacheStore::new(capacity).unwrap();
        let mut model: VecDeque<u8> = VecDeque::new();

        for (key, is_get) in ops {
            if is_get {
                let hit = store.get(&key, now).is_some();
                let position = model.iter().position(|k| *k == key);
                prop_assert_eq!(hit, position.is_some());
                if let Some(position) = position {
                    model.remove(position);
                    model.push_front(key);
                }
            } else {
                store.set(key, u32::from(key), Duration::ZERO, now);
                if let Some(position) = model.iter().position(|k| *k == key) {
                    model.remove(position);
                }
                model.push_front(key);
                model.truncate(capacity);
            }
            prop_assert_eq!(store.keys(), model.iter().copied().collect::<Vec<_>>());
        }
    }

    // Updating an existing key never changes the number of entries.
    #[test]
    fn prop_update_does_not_change_size(
        keys in prop::collection::hash_set(key_strategy(), 1..TEST_CAPACITY),
        ttl_ms in ttl_strategy()
    ) {
        let now = Instant::now();
        let mut store = CacheStore::new(TEST_CAPACITY).unwrap();
        for key in &keys {
            store.set(*key, 0, Duration::ZERO, now);
        }

        let before = store.len();
        for key in &keys {
            store.set(*key, 1, Duration::from_millis(ttl_ms), now);
            prop_assert_eq!(store.len(), before);
        }
        prop_assert_eq!(store.stats().evictions, 0);
    }

    // The heap always yields deadlines in non-decreasing order.
    #[test]
    fn prop_heap_pops_sorted(
        deadlines in prop::collection::vec(0u64..10_000, 1..100),
        reschedules in prop::collection::vec((any::<prop::sample::Index>(), 0u64..10_000), 0..30)
    ) {
        let base = Instant::now();
        let mut heap = ExpirationHeap::new();
        let ids: Vec<_> = deadlines
            .iter()
            .enumerate()
            .map(|(key, ms)| heap.push(key, base + Duration::from_millis(*ms)))
            .collect();

        for (index, ms) in reschedules {
            heap.reschedule(*index.get(&ids), base + Duration::from_millis(ms));
        }

        let mut last = base;
        let mut popped = 0;
        while let Some((_, record)) = heap.pop() {
            prop_assert!(record.expires_at >= last);
            last = record.expires_at;
            popped += 1;
        }
        prop_assert_eq!(popped, deadlines.len());
    }
}

// == Property Test for Concurrent Operation Correctness ==
// Many threads hammer one cache; afterwards the index must still be consistent.

#[derive(Debug, Clone)]
enum ConcurrentOp {
    Set(u8),
    SetWithTtl(u8, u64),
    Get(u8),
    Delete(u8),
    SetCapacity(usize),
}

fn concurrent_op_strategy() -> impl Strategy<Value = ConcurrentOp> {
    prop_oneof![
        key_strategy().prop_map(ConcurrentOp::Set),
        (key_strategy(), 1u64..5).prop_map(|(key, ms)| ConcurrentOp::SetWithTtl(key, ms)),
        key_strategy().prop_map(ConcurrentOp::Get),
        key_strategy().prop_map(ConcurrentOp::Delete),
        (1usize..16).prop_map(ConcurrentOp::SetCapacity),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn prop_concurrent_operation_correctness(
        workloads in prop::collection::vec(
            prop::collection::vec(concurrent_op_strategy(), 10..60),
            2..8
        )
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let cache = Arc::new(Cache::new(TEST_CAPACITY).unwrap());

            let handles: Vec<_> = workloads
                .into_iter()
                .map(|ops| {
                    let cache = Arc::clone(&cache);
                    tokio::task::spawn_blocking(move || {
                        for op in ops {
                            match op {
                                ConcurrentOp::Set(key) => cache.set(key, u32::from(key)),
                                ConcurrentOp::SetWithTtl(key, ms) => {
                                    cache.set_with_ttl(key, u32::from(key), Duration::from_millis(ms))
                                }
                                ConcurrentOp::Get(key) => {
                                    if let Some(value) = cache.get(&key) {
                                        assert_eq!(value, u32::from(key));
                                    }
                                }
                                ConcurrentOp::Delete(key) => {
                                    cache.delete(&key);
                                }
                                ConcurrentOp::SetCapacity(capacity) => {
                                    cache.set_capacity(capacity).unwrap();
                                }
                            }
                        }
                    })
                })
                .collect();

            for handle in handles {
                prop_assert!(handle.await.is_ok(), "Worker panicked");
            }

            prop_assert!(cache.len() <= cache.capacity());
            prop_assert_eq!(cache.keys().len(), cache.len());

            cache.shutdown().await;
            Ok(())
        })?;
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_order_example() {
        // Get(a) makes b the least recently used, so inserting d evicts b
        let now = Instant::now();
        let mut store = CacheStore::new(2).unwrap();
        store.set("a", 1, Duration::ZERO, now);
        store.set("b", 2, Duration::ZERO, now);
        store.get(&"a", now);
        store.set("d", 4, Duration::ZERO, now);

        assert_eq!(store.get(&"a", now), Some(1));
        assert_eq!(store.get(&"d", now), Some(4));
        assert_eq!(store.get(&"b", now), None);
    }

    #[test]
    fn test_block_on_cache_roundtrip() {
        tokio_test::block_on(async {
            let cache = Cache::new(2).unwrap();
            cache.set("k", "v");
            assert_eq!(cache.get(&"k"), Some("v"));
            cache.shutdown().await;
        });
    }
}
