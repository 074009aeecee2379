//! Cache Store Module
//!
//! Main cache engine combining the key index and eviction order with
//! capacity eviction and soft TTL expiry.
//!
//! The store is single-owner; [`crate::cache::TtlCache`] wraps it in a mutex
//! and shares it with the expiry sweeper. Every time-dependent method takes
//! `now` explicitly.

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::cache::entry::{deadline_after, CacheEntry};
use crate::cache::order::EvictionOrder;
use crate::cache::{CacheStats, Lookup};

// == Set Outcome ==
/// What a [`CacheStore::set`] call did.
#[derive(Debug, PartialEq, Eq)]
pub struct SetOutcome<K, V> {
    /// True if the key was absent and a new entry was created
    pub created: bool,
    /// Entry pushed out by capacity, at most one per set
    pub evicted: Option<(K, V)>,
    /// True if the new deadline is sooner than the next scheduled sweep
    pub rearm: bool,
}

// == Sweep Report ==
/// Summary of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries with a pending deadline that were inspected
    pub examined: usize,
    /// Entries newly found expired and moved to the back
    pub demoted: usize,
    /// Earliest deadline still pending after the pass
    pub next_expiry: Option<Instant>,
}

// == Cache Store ==
/// Cache storage with LRU eviction and soft TTL expiry.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key index + recency order
    order: EvictionOrder<K, V>,
    /// Activity counters
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL for entries set without an explicit one, None = never expire
    default_ttl: Option<Duration>,
    /// Earliest pending deadline known to the sweeper
    next_expiry: Option<Instant>,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL for entries set without one; `None` or zero
    ///   means such entries never expire
    pub fn new(capacity: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            order: EvictionOrder::with_capacity(capacity),
            stats: CacheStats::new(),
            capacity,
            default_ttl: default_ttl.filter(|ttl| !ttl.is_zero()),
            next_expiry: None,
        }
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// A `ttl` of `None` or zero uses the default TTL. An existing key is
    /// overwritten in place, its staleness cleared and promoted to the front.
    /// A new key goes to the front; if that pushes the cache over capacity, the
    /// back-most entry is evicted and returned.
    pub fn set(
        &mut self,
        key: K,
        value: V,
        ttl: Option<Duration>,
        now: Instant,
    ) -> SetOutcome<K, V> {
        let ttl = ttl.filter(|ttl| !ttl.is_zero()).or(self.default_ttl);
        let expires_at = deadline_after(now, ttl);
        let rearm = self.schedule(expires_at);

        let created = match self.order.insert_front(CacheEntry::new(key, value, expires_at)) {
            Ok(()) => true,
            Err(rejected) => {
                // Key already present
                if let Some(existing) = self.order.get_mut(&rejected.key) {
                    existing.overwrite(rejected.value, expires_at);
                }
                self.order.promote(&rejected.key);
                false
            }
        };

        let mut evicted = None;
        if created {
            self.stats.record_insertion();
            if self.order.len() > self.capacity {
                if let Some(victim) = self.order.pop_back() {
                    self.stats.record_eviction();
                    debug!(
                        capacity = self.capacity,
                        expired = victim.is_expired_at(now),
                        "Evicted back-most entry"
                    );
                    evicted = Some((victim.key, victim.value));
                }
            }
        } else {
            self.stats.record_update();
        }

        SetOutcome {
            created,
            evicted,
            rearm,
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A live entry is promoted and returned as [`Lookup::Fresh`]. An expired
    /// entry is demoted to the back and still returned, as [`Lookup::Stale`];
    /// it is neither deleted nor refreshed.
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Lookup<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let Some(entry) = self.order.get_mut(key) else {
            self.stats.record_miss();
            return Lookup::Miss;
        };

        if entry.is_expired_at(now) {
            entry.expired_seen = true;
            let value = entry.value.clone();
            self.order.demote(key);
            self.stats.record_stale_hit();
            Lookup::Stale(value)
        } else {
            let value = entry.value.clone();
            self.order.promote(key);
            self.stats.record_hit();
            Lookup::Fresh(value)
        }
    }

    // == Remove ==
    /// Removes an entry by key, returning whether it existed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if self.order.remove(key).is_some() {
            self.stats.record_removal();
            true
        } else {
            false
        }
    }

    // == Sweep ==
    /// Moves every newly expired entry to the back of the eviction order.
    ///
    /// Entries already known to be expired are skipped. Among the entries
    /// demoted by one pass, the one that expired earliest ends up at the very
    /// back; ties keep their prior relative order. Nothing is deleted.
    pub fn sweep(&mut self, now: Instant) -> SweepReport {
        let mut examined = 0;
        let mut expired: Vec<(Instant, usize)> = Vec::new();
        let mut next_expiry: Option<Instant> = None;

        for (slot, entry) in self.order.slots() {
            if entry.expired_seen {
                continue;
            }
            let Some(expires_at) = entry.expires_at else {
                continue;
            };

            examined += 1;
            if now >= expires_at {
                expired.push((expires_at, slot));
            } else {
                next_expiry = Some(next_expiry.map_or(expires_at, |next| next.min(expires_at)));
            }
        }

        // Latest deadline first: each demotion lands behind the previous one.
        expired.sort_by(|a, b| b.0.cmp(&a.0));
        for &(_, slot) in &expired {
            if let Some(entry) = self.order.entry_at_mut(slot) {
                entry.expired_seen = true;
            }
            self.order.demote_slot(slot);
        }

        self.next_expiry = next_expiry;
        self.stats.record_sweep(expired.len());
        trace!(examined, demoted = expired.len(), "Sweep pass complete");

        SweepReport {
            examined,
            demoted: expired.len(),
            next_expiry,
        }
    }

    // == Next Expiry ==
    /// Earliest pending deadline the sweeper should wake for.
    ///
    /// May be earlier than any live deadline after removals or overwrites; a
    /// sweep at that point is a no-op that recomputes it.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.next_expiry
    }

    /// Tracks the earliest deadline; returns true if it moved sooner.
    fn schedule(&mut self, expires_at: Option<Instant>) -> bool {
        match (expires_at, self.next_expiry) {
            (None, _) => false,
            (Some(deadline), Some(current)) if current <= deadline => false,
            (Some(deadline), _) => {
                self.next_expiry = Some(deadline);
                true
            }
        }
    }

    // == Inspection ==
    /// Checks for a key without touching its position.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.order.contains(key)
    }

    /// Keys from most recently used to next eviction victim.
    pub fn keys(&self) -> Vec<K> {
        self.order.keys().cloned().collect()
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.order.len());
        stats
    }

    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}
