//! Lazy set — optimistic traversal plus a per-node logical-deletion flag, making validation O(1)
//! and `contains` wait-free.
//!
//! Grounded on `original_source/set_lazy_sync.go` (`lazySyncSet`) for the list shape (per-node
//! mutex, `marked` flag, `validate(pred, curr) = !pred.marked && !curr.marked && pred.next ==
//! curr`) and on [`crate::optimistic`] for the Rust rendition of lock-free traversal through a
//! `crossbeam_epoch::Atomic` guarded link. One deliberate departure from the Go original: its
//! `Contains` still takes both node locks before reading `marked`. `contains` here must be
//! wait-free and lock-free — traverse from `HEAD` without ever locking — so this implementation's
//! `contains` takes no lock at all, reading `marked` through the epoch guard with acquire
//! semantics instead. This is a correctness requirement, not a stylistic choice, and is called
//! out here because it is the one place this module's behavior provably differs from the artifact
//! it's grounded on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam_epoch::{pin, unprotected, Atomic, Guard, Owned, Shared};
use crossbeam_utils::Backoff;

use crate::adt::{debug_assert_in_range, ConcurrentSet};

#[derive(Debug)]
struct Node {
    value: i64,
    next: Atomic<Node>,
    // Guards `pred`/`curr` participation in a commit window, exactly as in `optimistic`. Does
    // not guard `marked`, which is read without a lock by `contains`.
    lock: Mutex<()>,
    // Once true, never becomes false again. Readable without the lock with acquire
    // semantics; written only while holding `lock`, published with release semantics.
    marked: AtomicBool,
}

impl Node {
    fn new(value: i64, next: Atomic<Node>) -> Owned<Self> {
        Owned::new(Self {
            value,
            next,
            lock: Mutex::new(()),
            marked: AtomicBool::new(false),
        })
    }

    fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }
}

/// Concurrent sorted `i64` set with lock-free traversal, lock+validate commits, and a wait-free
/// `contains`.
#[derive(Debug)]
pub struct LazySet {
    head: Atomic<Node>,
}

impl LazySet {
    /// Creates a new, empty set (containing only the sentinels).
    pub fn new() -> Self {
        let tail = Node::new(i64::MAX, Atomic::null());
        let head = Node::new(i64::MIN, Atomic::from(tail));
        Self {
            head: Atomic::from(head),
        }
    }

    /// Lock-free walk to the first node with `value >= target`, returning `(pred, curr)`.
    /// Unlike `optimistic::locate`, this does not need to skip marked nodes specially: a marked
    /// node's `value` is unchanged, so the ordinary `value`-based walk still lands on the
    /// correct window; `validate` is what rejects a window straddling a mark.
    fn locate<'g>(&'g self, target: i64, guard: &'g Guard) -> (Shared<'g, Node>, Shared<'g, Node>) {
        let mut pred = self.head.load(Ordering::Acquire, guard);
        // SAFETY: the chain always terminates in the `MAX` sentinel.
        let mut curr = unsafe { pred.deref() }.next.load(Ordering::Acquire, guard);
        loop {
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value >= target {
                return (pred, curr);
            }
            pred = curr;
            curr = curr_ref.next.load(Ordering::Acquire, guard);
        }
    }

    /// O(1) validation: no re-scan from `HEAD`, just the three local checks.
    fn validate(pred_ref: &Node, curr: Shared<'_, Node>, guard: &Guard) -> bool {
        !pred_ref.is_marked() && pred_ref.next.load(Ordering::Acquire, guard) == curr
    }

    fn with_validated_window<R>(
        &self,
        target: i64,
        guard: &Guard,
        mut commit: impl FnMut(Shared<'_, Node>, Shared<'_, Node>, &Node, &Node) -> R,
    ) -> R {
        let backoff = Backoff::new();
        loop {
            let (pred, curr) = self.locate(target, guard);
            let pred_ref = unsafe { pred.as_ref() }.expect("pred is never null");
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            let _pred_guard = pred_ref.lock.lock().expect("node mutex poisoned");
            let _curr_guard = curr_ref.lock.lock().expect("node mutex poisoned");
            // curr_ref.is_marked() is covered by the `pred.next == curr` check together with the
            // fact that a marked curr is about to be unlinked by its remover, who holds curr's
            // lock; we cannot observe a stale pred.next == curr pointing at an already-unlinked
            // curr because unlinking also happens under pred's lock — but `validate`'s contract
            // names the check explicitly, so check it explicitly too.
            if curr_ref.is_marked() || !Self::validate(pred_ref, curr, guard) {
                backoff.spin();
                continue;
            }
            return commit(pred, curr, pred_ref, curr_ref);
        }
    }
}

impl Default for LazySet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentSet for LazySet {
    fn insert(&self, value: i64) -> bool {
        debug_assert_in_range!(value);
        let guard = &pin();
        self.with_validated_window(value, guard, |_pred, curr, pred_ref, curr_ref| {
            if curr_ref.value == value {
                return false;
            }
            let new_node = Node::new(value, Atomic::from(curr)).into_shared(guard);
            pred_ref.next.store(new_node, Ordering::Release);
            true
        })
    }

    fn contains(&self, value: i64) -> bool {
        debug_assert_in_range!(value);
        // Wait-free and lock-free: a single monotone traversal, no locks, no retries.
        let guard = &pin();
        let mut curr = self.head.load(Ordering::Acquire, guard);
        loop {
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value >= value {
                return curr_ref.value == value && !curr_ref.is_marked();
            }
            curr = curr_ref.next.load(Ordering::Acquire, guard);
        }
    }

    fn remove(&self, value: i64) -> bool {
        debug_assert_in_range!(value);
        let guard = &pin();
        self.with_validated_window(value, guard, |_pred, curr, pred_ref, curr_ref| {
            if curr_ref.value != value {
                return false;
            }
            // Linearization point: the mark, not the unlink. Order matters — a
            // concurrent `contains` must see either "not yet marked, still a member" or "marked,
            // no longer a member", never an in-between state.
            curr_ref.marked.store(true, Ordering::Release);
            let succ = curr_ref.next.load(Ordering::Acquire, guard);
            pred_ref.next.store(succ, Ordering::Release);
            // SAFETY: `curr` was just unlinked under both its own and its predecessor's lock, so
            // no future lock-holding traversal can reach it; deferred to let any lock-free
            // `contains` that already loaded it finish reading safely.
            unsafe { guard.defer_destroy(curr) };
            true
        })
    }
}

impl Drop for LazySet {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no concurrent access is possible.
        unsafe {
            let guard = unprotected();
            let mut curr = self.head.load(Ordering::Relaxed, guard);
            while !curr.is_null() {
                let next = curr.deref().next.load(Ordering::Relaxed, guard);
                drop(curr.into_owned());
                curr = next;
            }
        }
    }
}

#[cfg(test)]
impl LazySet {
    /// Internal-only sorted walk of live (unmarked) values, used by tests to check sortedness and
    /// uniqueness after a concurrent history. Not part of the public API: iteration is
    /// deliberately not exposed.
    pub(crate) fn debug_items(&self) -> Vec<i64> {
        let guard = &pin();
        let mut out = Vec::new();
        let mut curr = self.head.load(Ordering::Acquire, guard);
        loop {
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value != i64::MIN && curr_ref.value != i64::MAX && !curr_ref.is_marked() {
                out.push(curr_ref.value);
            }
            if curr_ref.value == i64::MAX {
                return out;
            }
            curr = curr_ref.next.load(Ordering::Acquire, guard);
        }
    }
}
