//! Cache Module
//!
//! Provides an in-memory cache with LRU eviction and soft TTL expiry.

mod entry;
mod lookup;
mod order;
mod stats;
mod store;
mod ttl_cache;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use lookup::Lookup;
pub use stats::CacheStats;
pub use store::{CacheStore, SetOutcome, SweepReport};
pub use ttl_cache::{EvictCallback, LruTtlCache, TtlCache};
