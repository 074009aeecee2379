//! Lookup Result Module
//!
//! The outcome of a cache read: a hit, a stale hit, or a miss.

// == Lookup ==
/// Result of a cache read.
///
/// An expired entry is still handed back as [`Lookup::Stale`] rather than
/// disappearing. A miss never carries a stale flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    /// Entry found and within its TTL
    Fresh(V),
    /// Entry found but its TTL has lapsed
    Stale(V),
    /// Key not present
    Miss,
}

impl<V> Lookup<V> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Lookup::Stale(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Lookup::Miss)
    }

    /// Borrows the value, fresh or stale.
    pub fn value(&self) -> Option<&V> {
        match self {
            Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
            Lookup::Miss => None,
        }
    }

    /// Takes the value, fresh or stale.
    pub fn into_value(self) -> Option<V> {
        match self {
            Lookup::Fresh(value) | Lookup::Stale(value) => Some(value),
            Lookup::Miss => None,
        }
    }

    /// Splits into `(value, stale)`.
    pub fn into_parts(self) -> (Option<V>, bool) {
        match self {
            Lookup::Fresh(value) => (Some(value), false),
            Lookup::Stale(value) => (Some(value), true),
            Lookup::Miss => (None, false),
        }
    }
}
