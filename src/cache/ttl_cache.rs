//! TTL Cache Module
//!
//! Thread-safe cache handle: a mutex-guarded [`CacheStore`] plus its expiry
//! sweeper, or a disabled sentinel that misses on every call.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::{CacheStats, CacheStore, Lookup};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::tasks::{spawn_sweeper, Sweeper};

/// Called with the key and value of every entry evicted for capacity.
///
/// Runs on the thread that called [`TtlCache::set`], after the cache lock has
/// been released, so it may call back into the same cache.
pub type EvictCallback<K, V> = Box<dyn Fn(K, V) + Send + Sync>;

// == TTL Cache ==
/// Size-bounded LRU cache with soft TTL expiry.
///
/// Built with a capacity of zero it is [`TtlCache::Disabled`]: `set` reports
/// nothing created, `get` always misses and `remove` finds nothing.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttlcache::{Lookup, TtlCache};
///
/// let cache = TtlCache::new(2, Some(Duration::from_secs(60)), None).unwrap();
/// assert!(cache.set("a", 1, None));
/// assert_eq!(cache.get("a"), Lookup::Fresh(1));
/// assert_eq!(cache.get("b"), Lookup::Miss);
/// ```
#[derive(Debug)]
pub enum TtlCache<K, V> {
    /// Live cache
    Enabled(LruTtlCache<K, V>),
    /// No-op sentinel
    Disabled,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries.
    ///
    /// # Arguments
    /// * `capacity` - Entry count ceiling; zero yields a disabled cache
    /// * `default_ttl` - TTL for sets without one; `None` or zero = never expire
    /// * `on_evict` - Optional callback for capacity evictions
    ///
    /// # Errors
    /// Returns [`crate::CacheError::Sweeper`] if the expiry sweeper cannot start.
    pub fn new(
        capacity: usize,
        default_ttl: Option<Duration>,
        on_evict: Option<EvictCallback<K, V>>,
    ) -> Result<Self> {
        let config = CacheConfig {
            capacity,
            default_ttl,
            ..CacheConfig::default()
        };
        Self::with_config(&config, on_evict)
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn with_config(
        config: &CacheConfig,
        on_evict: Option<EvictCallback<K, V>>,
    ) -> Result<Self> {
        if config.capacity == 0 {
            warn!("Cache capacity is zero, every operation will miss");
            return Ok(TtlCache::Disabled);
        }
        LruTtlCache::start(config, on_evict).map(TtlCache::Enabled)
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Returns the no-op sentinel.
    pub fn disabled() -> Self {
        TtlCache::Disabled
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, TtlCache::Enabled(_))
    }

    // == Set ==
    /// Stores a key-value pair, returning true if the key was newly created.
    ///
    /// A `ttl` of `None` or zero uses the default TTL.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) -> bool {
        match self {
            TtlCache::Enabled(cache) => cache.set(key, value, ttl),
            TtlCache::Disabled => false,
        }
    }

    /// Stores a key-value pair with the default TTL.
    pub fn insert(&self, key: K, value: V) -> bool {
        self.set(key, value, None)
    }

    // == Get ==
    /// Retrieves a copy of the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Lookup<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        match self {
            TtlCache::Enabled(cache) => cache.get(key),
            TtlCache::Disabled => Lookup::Miss,
        }
    }

    // == Remove ==
    /// Removes `key`, returning whether it existed. Never calls `on_evict`.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self {
            TtlCache::Enabled(cache) => cache.remove(key),
            TtlCache::Disabled => false,
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self {
            TtlCache::Enabled(cache) => cache.contains_key(key),
            TtlCache::Disabled => false,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TtlCache::Enabled(cache) => cache.len(),
            TtlCache::Disabled => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        match self {
            TtlCache::Enabled(cache) => cache.capacity(),
            TtlCache::Disabled => 0,
        }
    }

    pub fn stats(&self) -> CacheStats {
        match self {
            TtlCache::Enabled(cache) => cache.stats(),
            TtlCache::Disabled => CacheStats::default(),
        }
    }

    /// Runs one sweep pass now, returning how many entries were demoted.
    pub fn sweep_now(&self) -> usize {
        match self {
            TtlCache::Enabled(cache) => cache.sweep_now(),
            TtlCache::Disabled => 0,
        }
    }
}

// == LRU TTL Cache ==
/// The enabled variant of [`TtlCache`].
pub struct LruTtlCache<K, V> {
    /// Index + order, shared with the sweeper
    store: Arc<Mutex<CacheStore<K, V>>>,
    /// Wakes the sweeper when a sooner deadline appears
    rearm: Arc<Notify>,
    on_evict: Option<EvictCallback<K, V>>,
    capacity: usize,
    sweeper: Sweeper,
}

impl<K, V> LruTtlCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    fn start(config: &CacheConfig, on_evict: Option<EvictCallback<K, V>>) -> Result<Self> {
        let store = Arc::new(Mutex::new(CacheStore::new(
            config.capacity,
            config.default_ttl,
        )));
        let rearm = Arc::new(Notify::new());
        let sweeper = spawn_sweeper(&store, rearm.clone(), config.sweep.normalized())?;

        info!(
            capacity = config.capacity,
            default_ttl = ?config.default_ttl,
            "Cache initialized"
        );

        Ok(Self {
            store,
            rearm,
            on_evict,
            capacity: config.capacity,
            sweeper,
        })
    }
}

impl<K, V> LruTtlCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) -> bool {
        let outcome = self.store.lock().set(key, value, ttl, Instant::now());

        if outcome.rearm {
            self.rearm.notify_one();
        }
        // Lock already released: the callback may re-enter the cache.
        if let (Some((key, value)), Some(on_evict)) = (outcome.evicted, &self.on_evict) {
            on_evict(key, value);
        }

        outcome.created
    }

    pub fn get<Q>(&self, key: &Q) -> Lookup<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.store.lock().get(key, Instant::now())
    }

    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.lock().remove(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.store.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn sweep_now(&self) -> usize {
        self.store.lock().sweep(Instant::now()).demoted
    }

    /// Keys from most recently used to next eviction victim.
    pub fn keys(&self) -> Vec<K> {
        self.store.lock().keys()
    }
}

impl<K, V> std::fmt::Debug for LruTtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruTtlCache")
            .field("capacity", &self.capacity)
            .field("on_evict", &self.on_evict.is_some())
            .field("sweeper", &self.sweeper)
            .finish()
    }
}
