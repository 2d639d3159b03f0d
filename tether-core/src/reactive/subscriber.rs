//! Subscriber identity.
//!
//! Every computation that can depend on a signal (today only effects) is
//! identified by a [`SubscriberId`]. The runtime keys its dependency table and
//! its registry of live computations by this id.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a reactive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Allocate a fresh id. Ids are never reused within a process.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value, for logging.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}
