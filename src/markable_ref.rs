//! The atomic markable reference: a `(node reference, mark bit)` pair read, written, and
//! compared-and-swapped as a single atomic unit.
//!
//! Two realizations are equally acceptable: pointer-tag packing into a reserved low bit of the
//! address, or a boxed `{ref, mark}` swapped by pointer. This crate already depends on
//! `crossbeam-epoch` for reclamation (see [`crate::non_blocking`]), and `crossbeam_epoch::Atomic<T>`'s
//! tag bits are exactly the pointer-tag-packing realization — the same idiom other Harris-style
//! lock-free lists use for logical deletion, marking a node's `next` with `fetch_or(1, ..)` and
//! reading it back with `.tag()`. Using the tag bit rather than a boxed indirection avoids an
//! extra allocation per update, at the cost of requiring node addresses to be at least 2-byte
//! aligned — true of every heap allocation on every mainstream platform, and asserted at
//! construction.

use std::sync::atomic::Ordering;

use crossbeam_epoch::{Atomic, Guard, Owned, Shared};

const MARK_TAG: usize = 1;

/// A `(Shared<'_, T>, bool)` pair packed into one atomically-updatable word via the pointer's
/// tag bit.
#[derive(Debug)]
pub(crate) struct MarkableAtomic<T> {
    inner: Atomic<T>,
}

impl<T> MarkableAtomic<T> {
    /// Wraps a freshly-allocated, not-yet-published node with the given initial mark.
    pub(crate) fn new(initial: Owned<T>, mark: bool) -> Self {
        assert_eq!(
            (&*initial as *const T as usize) & MARK_TAG,
            0,
            "node address must be at least 2-byte aligned for tag packing"
        );
        let tag = if mark { MARK_TAG } else { 0 };
        Self {
            inner: Atomic::from(initial.with_tag(tag)),
        }
    }

    /// A markable reference whose referent is null (used for `TAIL.next`, which must be a
    /// *valid* atomic markable reference that the traversal provably never dereferences, not an
    /// absent field).
    pub(crate) fn null() -> Self {
        Self {
            inner: Atomic::null(),
        }
    }

    /// A markable reference pointing at an already-published node (as opposed to [`Self::new`],
    /// which takes ownership of a freshly allocated one). Used when linking a brand-new node's
    /// `next` field to an existing node already reachable from `HEAD`.
    pub(crate) fn from_shared(initial: Shared<'_, T>, mark: bool) -> Self {
        let tag = if mark { MARK_TAG } else { 0 };
        Self {
            inner: Atomic::from(initial.with_tag(tag)),
        }
    }

    /// `get_ref`: the referent, ignoring the mark.
    pub(crate) fn get_ref<'g>(&self, guard: &'g Guard) -> Shared<'g, T> {
        self.inner.load(Ordering::Acquire, guard).with_tag(0)
    }

    /// `get_mark`: the mark bit alone.
    pub(crate) fn get_mark(&self, guard: &Guard) -> bool {
        self.inner.load(Ordering::Acquire, guard).tag() & MARK_TAG != 0
    }

    /// `get_both`: an atomic snapshot of `(reference, mark)` taken in a single read — the caller
    /// can never observe the reference from one update paired with the mark from another.
    pub(crate) fn get_both<'g>(&self, guard: &'g Guard) -> (Shared<'g, T>, bool) {
        let snapshot = self.inner.load(Ordering::Acquire, guard);
        (snapshot.with_tag(0), snapshot.tag() & MARK_TAG != 0)
    }

    /// `compare_and_set`: atomically replaces `(expected_ref, expected_mark)` with
    /// `(desired_ref, desired_mark)`. Returns `Ok` with the new snapshot on success, `Err` with
    /// the observed current snapshot on failure.
    pub(crate) fn compare_and_set<'g>(
        &self,
        expected_ref: Shared<'g, T>,
        desired_ref: Shared<'g, T>,
        expected_mark: bool,
        desired_mark: bool,
        guard: &'g Guard,
    ) -> Result<Shared<'g, T>, Shared<'g, T>> {
        let expected = expected_ref.with_tag(if expected_mark { MARK_TAG } else { 0 });
        let desired = desired_ref.with_tag(if desired_mark { MARK_TAG } else { 0 });
        self.inner
            .compare_exchange(expected, desired, Ordering::AcqRel, Ordering::Acquire, guard)
            .map(|_| desired)
            .map_err(|e| e.current)
    }
}
