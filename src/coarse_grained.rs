//! Coarse-grained ordered set — one readers/writer lock around the sequential oracle.
//!
//! Grounded on `original_source/set_coarse_grained_sync.go`: a single `sync.RWMutex` wrapping a
//! `sequentialSet`, `Lock`/`Unlock` for `Insert`/`Remove`, `RLock`/`RUnlock` for `Contains`. The
//! Rust rendition swaps `sync.RWMutex` for `std::sync::RwLock`; the lock guard's `Drop` takes the
//! place of Go's `defer Unlock()`, so every exit path — including an early return — releases it.

use std::sync::RwLock;

use crate::adt::ConcurrentSet;
use crate::sequential::SequentialSet;

/// Wraps [`SequentialSet`] behind a single `RwLock`. The critical section of each operation is
/// exactly one complete sequential operation, so linearizability reduces directly to the
/// sequential correctness already exercised by `sequential::tests`.
#[derive(Debug)]
pub struct CoarseGrainedSet {
    inner: RwLock<SequentialSet>,
}

impl CoarseGrainedSet {
    /// Creates a new, empty set.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SequentialSet::new()),
        }
    }
}

impl Default for CoarseGrainedSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentSet for CoarseGrainedSet {
    fn insert(&self, value: i64) -> bool {
        let guard = self.inner.write().expect("coarse-grained lock poisoned");
        guard.insert(value)
    }

    fn contains(&self, value: i64) -> bool {
        let guard = self.inner.read().expect("coarse-grained lock poisoned");
        guard.contains(value)
    }

    fn remove(&self, value: i64) -> bool {
        let guard = self.inner.write().expect("coarse-grained lock poisoned");
        guard.remove(value)
    }
}

#[cfg(test)]
impl CoarseGrainedSet {
    /// Internal-only sorted walk of the guarded sequential oracle, used by tests to check
    /// sortedness and uniqueness after a concurrent history. Not part of the public API:
    /// iteration is deliberately not exposed.
    pub(crate) fn debug_items(&self) -> Vec<i64> {
        let guard = self.inner.read().expect("coarse-grained lock poisoned");
        guard.debug_items()
    }
}
