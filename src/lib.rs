//! ttlcache - An in-process size-bounded cache
//!
//! Combines LRU capacity eviction with per-entry TTL. Expired entries are
//! not dropped on read: they come back as [`Lookup::Stale`] and move to the
//! back of the eviction order, and a background sweeper does the same for
//! expired entries nobody reads.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{CacheStats, EvictCallback, Lookup, TtlCache};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::SweepSchedule;
