//! Five concurrent ordered-`i64`-set implementations, plus the sequential oracle they're checked
//! against, sharing one logical model: a sorted singly-linked list with `MIN`/`MAX` sentinels.
//!
//! Each variant exposes the same three total operations ([`ConcurrentSet::insert`],
//! [`ConcurrentSet::contains`], [`ConcurrentSet::remove`]) and differs only in how it
//! synchronizes traversal and mutation across threads:
//!
//! - [`sequential`] — single-threaded oracle, `!Sync` by construction.
//! - [`coarse_grained`] — one `RwLock` around the oracle.
//! - [`fine_grained`] — per-node mutex, two-lock hand-over-hand traversal.
//! - [`optimistic`] — lock-free traversal, lock + validate-by-rescan commit.
//! - [`lazy`] — optimistic plus a per-node logical-deletion flag; `contains` is wait-free.
//! - [`non_blocking`] — lock-free throughout, built on the atomic markable reference
//!   ([`markable_ref`]); `contains` is wait-free.
//!
//! [`kind::SetKind`] is the runtime factory used by tests and benchmarks to iterate over every
//! variant uniformly.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]

pub mod adt;
pub mod coarse_grained;
pub mod fine_grained;
pub mod kind;
pub mod lazy;
#[cfg(feature = "check-loom")]
mod loom_model;
mod markable_ref;
pub mod non_blocking;
pub mod optimistic;
pub mod sequential;

#[cfg(test)]
pub(crate) mod test;

pub use adt::ConcurrentSet;
pub use coarse_grained::CoarseGrainedSet;
pub use fine_grained::FineGrainedSet;
pub use kind::SetKind;
pub use lazy::LazySet;
pub use non_blocking::NonBlockingSet;
pub use optimistic::OptimisticSet;
pub use sequential::SequentialSet;
