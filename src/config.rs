//! Configuration Module
//!
//! Cache construction parameters, with defaults and loading from environment
//! variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::tasks::SweepSchedule;

/// Maximum cache entries; zero or negative builds a disabled cache
pub const CAPACITY_VAR: &str = "TTLCACHE_CAPACITY";
/// Default TTL in milliseconds; zero means entries never expire by default
pub const DEFAULT_TTL_VAR: &str = "TTLCACHE_DEFAULT_TTL_MS";
/// Fixed sweep period in milliseconds; absent or zero sweeps at nearest expiry
pub const SWEEP_INTERVAL_VAR: &str = "TTLCACHE_SWEEP_INTERVAL_MS";

/// Cache configuration parameters.
///
/// Immutable once the cache is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold, 0 = disabled cache
    pub capacity: usize,
    /// Default TTL for entries without explicit TTL, None = never expire
    pub default_ttl: Option<Duration>,
    /// When the background sweeper wakes up
    pub sweep: SweepSchedule,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TTLCACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `TTLCACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `TTLCACHE_SWEEP_INTERVAL_MS` - Fixed sweep period (default: nearest expiry)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`CacheConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(CAPACITY_VAR) {
            let capacity: i64 = parse_var(CAPACITY_VAR, &raw)?;
            config.capacity = if capacity <= 0 {
                0
            } else {
                usize::try_from(capacity).unwrap_or(usize::MAX)
            };
        }

        if let Some(raw) = lookup(DEFAULT_TTL_VAR) {
            let millis: u64 = parse_var(DEFAULT_TTL_VAR, &raw)?;
            config.default_ttl = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(raw) = lookup(SWEEP_INTERVAL_VAR) {
            let millis: u64 = parse_var(SWEEP_INTERVAL_VAR, &raw)?;
            config.sweep = if millis == 0 {
                SweepSchedule::NearestExpiry
            } else {
                SweepSchedule::Every(Duration::from_millis(millis))
            };
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(var: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| CacheError::InvalidConfig {
        var,
        value: raw.to_string(),
    })
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            default_ttl: Some(Duration::from_secs(300)),
            sweep: SweepSchedule::NearestExpiry,
        }
    }
}
