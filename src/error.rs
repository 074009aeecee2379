//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Cache misses and stale
//! reads are ordinary results, so the only failures are configuration
//! problems and a sweeper that cannot be started.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A configuration value could not be parsed
    #[error("Invalid configuration: {var}={value:?}")]
    InvalidConfig {
        /// Name of the offending variable
        var: &'static str,
        /// Raw value that failed to parse
        value: String,
    },

    /// The background expiry sweeper could not be started
    #[error("Failed to start expiry sweeper: {0}")]
    Sweeper(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
