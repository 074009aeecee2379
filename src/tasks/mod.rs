//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Expiry Sweeper: moves expired entries to the back of the eviction order

mod sweeper;

pub(crate) use sweeper::{spawn_sweeper, Sweeper};
pub use sweeper::SweepSchedule;
