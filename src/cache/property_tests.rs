//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store against a simple reference model and to
//! verify the capacity, miss and disabled-cache properties.

use proptest::prelude::*;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheStore, Lookup, TtlCache};

// == Test Configuration ==
const TEST_DEFAULT_TTL_MS: u64 = 50;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32, ttl_ms: u64 },
    Get { key: String },
    Remove { key: String },
    Advance { ms: u64 },
    Sweep,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (key_strategy(), any::<u32>(), prop_oneof![Just(0u64), 1u64..200])
            .prop_map(|(key, value, ttl_ms)| CacheOp::Set { key, value, ttl_ms }),
        3 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        2 => (1u64..100).prop_map(|ms| CacheOp::Advance { ms }),
        1 => Just(CacheOp::Sweep),
    ]
}

// == Reference Model ==
/// Straightforward O(n) model: a recency deque (front = most recent) plus a
/// map of `(value, expires_at_ms, expired_seen)`.
struct Model {
    order: VecDeque<String>,
    entries: HashMap<String, (u32, u64, bool)>,
    capacity: usize,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            entries: HashMap::new(),
            capacity,
        }
    }

    fn to_front(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_front(key.to_string());
    }

    fn to_back(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
    }

    fn set(
        &mut self,
        key: &str,
        value: u32,
        ttl_ms: u64,
        now: u64,
    ) -> (bool, Option<(String, u32)>) {
        let ttl = if ttl_ms == 0 { TEST_DEFAULT_TTL_MS } else { ttl_ms };
        let created = !self.entries.contains_key(key);
        self.entries.insert(key.to_string(), (value, now + ttl, false));
        self.to_front(key);

        let mut evicted = None;
        if created && self.order.len() > self.capacity {
            if let Some(victim) = self.order.pop_back() {
                if let Some((value, _, _)) = self.entries.remove(&victim) {
                    evicted = Some((victim, value));
                }
            }
        }
        (created, evicted)
    }

    fn get(&mut self, key: &str, now: u64) -> Lookup<u32> {
        let Some(entry) = self.entries.get_mut(key) else {
            return Lookup::Miss;
        };
        if now >= entry.1 {
            entry.2 = true;
            let value = entry.0;
            self.to_back(key);
            Lookup::Stale(value)
        } else {
            let value = entry.0;
            self.to_front(key);
            Lookup::Fresh(value)
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        self.order.retain(|k| k != key);
        self.entries.remove(key).is_some()
    }

    fn sweep(&mut self, now: u64) -> usize {
        let mut expired: Vec<(u64, String)> = self
            .order
            .iter()
            .filter_map(|key| {
                let (_, expires, seen) = self.entries[key];
                (!seen && now >= expires).then(|| (expires, key.clone()))
            })
            .collect();
        expired.sort_by(|a, b| b.0.cmp(&a.0));

        for (_, key) in &expired {
            if let Some(entry) = self.entries.get_mut(key) {
                entry.2 = true;
            }
            self.to_back(key);
        }
        expired.len()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // The store agrees with the reference model on every result and on the
    // full eviction order after every operation.
    #[test]
    fn prop_store_matches_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let base = Instant::now();
        let mut now_ms = 0u64;
        let default_ttl = Duration::from_millis(TEST_DEFAULT_TTL_MS);
        let mut store = CacheStore::new(capacity, Some(default_ttl));
        let mut model = Model::new(capacity);

        for op in ops {
            let now = base + Duration::from_millis(now_ms);
            match op {
                CacheOp::Set { key, value, ttl_ms } => {
                    let ttl = Some(Duration::from_millis(ttl_ms));
                    let outcome = store.set(key.clone(), value, ttl, now);
                    let (created, evicted) = model.set(&key, value, ttl_ms, now_ms);
                    prop_assert_eq!(outcome.created, created);
                    prop_assert_eq!(outcome.evicted, evicted);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(key.as_str(), now), model.get(&key, now_ms));
                }
                CacheOp::Remove { key } => {
                    prop_assert_eq!(store.remove(key.as_str()), model.remove(&key));
                }
                CacheOp::Advance { ms } => now_ms += ms,
                CacheOp::Sweep => {
                    prop_assert_eq!(store.sweep(now).demoted, model.sweep(now_ms));
                }
            }

            prop_assert_eq!(store.keys(), model.order.iter().cloned().collect::<Vec<_>>());
        }
    }

    // For any sequence of sets, the number of entries never exceeds capacity
    // and every overflowing insert evicts exactly one entry.
    #[test]
    fn prop_capacity_enforcement(
        capacity in 1usize..20,
        keys in prop::collection::vec(key_strategy(), 1..200)
    ) {
        let now = Instant::now();
        let mut store = CacheStore::new(capacity, None);

        for (i, key) in keys.into_iter().enumerate() {
            let full_before = store.len() == capacity;
            let outcome = store.set(key, i, None, now);
            prop_assert!(
                store.len() <= capacity,
                "Cache size {} exceeds max {}",
                store.len(),
                capacity
            );
            prop_assert_eq!(outcome.evicted.is_some(), outcome.created && full_before);
        }
    }

    // A miss is never reported stale, however much time has passed.
    #[test]
    fn prop_idempotent_miss(
        present in prop::collection::vec(key_strategy(), 0..10),
        absent in "[x-z]{1,3}",
        elapsed_ms in 0u64..10_000
    ) {
        let now = Instant::now();
        let mut store = CacheStore::new(8, Some(Duration::from_millis(1)));
        for key in present {
            store.set(key, 0u8, None, now);
        }

        let later = now + Duration::from_millis(elapsed_ms);
        prop_assert_eq!(store.get(absent.as_str(), later), Lookup::Miss);
        prop_assert_eq!(store.get(absent.as_str(), later), Lookup::Miss);
    }

    // Reading an expired key returns the original value, flagged stale, on
    // every read until it is overwritten.
    #[test]
    fn prop_staleness_is_non_destructive(
        value in any::<u64>(),
        reads in 1usize..10,
        ttl_ms in 1u64..1000
    ) {
        let now = Instant::now();
        let mut store = CacheStore::new(4, None);
        store.set("k", value, Some(Duration::from_millis(ttl_ms)), now);

        let later = now + Duration::from_millis(ttl_ms);
        for _ in 0..reads {
            prop_assert_eq!(store.get("k", later), Lookup::Stale(value));
        }

        store.set("k", value.wrapping_add(1), Some(Duration::from_millis(ttl_ms)), later);
        prop_assert_eq!(store.get("k", later), Lookup::Fresh(value.wrapping_add(1)));
    }

    // A disabled cache ignores everything.
    #[test]
    fn prop_disabled_cache(ops in prop::collection::vec(cache_op_strategy(), 1..30)) {
        let cache: TtlCache<String, u32> = TtlCache::disabled();

        for op in ops {
            match op {
                CacheOp::Set { key, value, ttl_ms } => {
                    prop_assert!(!cache.set(key, value, Some(Duration::from_millis(ttl_ms))));
                }
                CacheOp::Get { key } => prop_assert_eq!(cache.get(key.as_str()), Lookup::Miss),
                CacheOp::Remove { key } => prop_assert!(!cache.remove(key.as_str())),
                CacheOp::Advance { .. } => {}
                CacheOp::Sweep => prop_assert_eq!(cache.sweep_now(), 0),
            }
            prop_assert_eq!(cache.len(), 0);
        }
    }
}
