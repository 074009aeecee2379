//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single cache entry: key, value and absolute expiry instant.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<K, V> {
    /// The key this entry is indexed under
    pub key: K,
    /// The stored value
    pub value: V,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
    /// Set once a read or a sweep has observed the entry as expired
    pub expired_seen: bool,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new cache entry expiring at `expires_at`.
    pub fn new(key: K, value: V, expires_at: Option<Instant>) -> Self {
        Self {
            key,
            value,
            expires_at,
            expired_seen: false,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired as of `now`.
    ///
    /// An entry is expired once `now >= expires_at`, so a TTL that has fully
    /// elapsed is expired immediately.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    #[cfg(test)]
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }

    // == Overwrite ==
    /// Replaces value and expiry and forgets any earlier staleness.
    pub fn overwrite(&mut self, value: V, expires_at: Option<Instant>) {
        self.value = value;
        self.expires_at = expires_at;
        self.expired_seen = false;
    }
}

// == Utility Functions ==
/// Absolute deadline `ttl` after `now`.
///
/// `None` means the entry never expires. A TTL that overflows the clock is
/// treated the same way.
pub(crate) fn deadline_after(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|ttl| now.checked_add(ttl))
}
