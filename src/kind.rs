//! Runtime variant selection via a tagged enumeration.
//!
//! Used only by tests/benchmarks that want to iterate over every synchronization strategy
//! uniformly; production call sites pick a concrete type at compile time instead (see
//! `crate::sequential::SequentialSet`, `crate::coarse_grained::CoarseGrainedSet`, etc.) and pay no
//! dynamic-dispatch cost. A single trait object behind a closed enum, not an inheritance
//! hierarchy.

use crate::adt::ConcurrentSet;
use crate::coarse_grained::CoarseGrainedSet;
use crate::fine_grained::FineGrainedSet;
use crate::lazy::LazySet;
use crate::non_blocking::NonBlockingSet;
use crate::optimistic::OptimisticSet;
use crate::sequential::SequentialSet;

/// Which of the six synchronization strategies [`Self::build`] should construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetKind {
    /// Single-threaded oracle. The built set is not `Sync`; never share it across threads.
    Sequential,
    /// One `RwLock` around the sequential oracle.
    CoarseGrained,
    /// Per-node mutex, two-lock hand-over-hand traversal.
    FineGrained,
    /// Lock-free traversal, lock + validate-by-rescan commit.
    Optimistic,
    /// Optimistic plus a per-node logical-deletion flag; wait-free `contains`.
    Lazy,
    /// Lock-free, atomic (reference, mark) pair per node; wait-free `contains`.
    NonBlocking,
}

impl SetKind {
    /// Every variant, from simplest locking strategy to fully lock-free.
    pub const ALL: [Self; 6] = [
        Self::Sequential,
        Self::CoarseGrained,
        Self::FineGrained,
        Self::Optimistic,
        Self::Lazy,
        Self::NonBlocking,
    ];

    /// Every variant safe to share and mutate across threads (excludes [`Self::Sequential`]).
    pub const CONCURRENT: [Self; 5] = [
        Self::CoarseGrained,
        Self::FineGrained,
        Self::Optimistic,
        Self::Lazy,
        Self::NonBlocking,
    ];

    /// Constructs a fresh, empty set of this variant.
    pub fn build(self) -> Box<dyn ConcurrentSet> {
        match self {
            Self::Sequential => Box::new(SequentialSet::new()),
            Self::CoarseGrained => Box::new(CoarseGrainedSet::new()),
            Self::FineGrained => Box::new(FineGrainedSet::new()),
            Self::Optimistic => Box::new(OptimisticSet::new()),
            Self::Lazy => Box::new(LazySet::new()),
            Self::NonBlocking => Box::new(NonBlockingSet::new()),
        }
    }
}
