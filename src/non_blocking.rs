//! Non-blocking set — lock-free `insert`/`remove`, wait-free `contains`, built on the
//! atomic markable reference ([`crate::markable_ref`]).
//!
//! Grounded on `original_source/set_nonblocking.go` for the `atomicMarkableReference` shape (a
//! single word packing a node pointer and a one-bit mark, `compareAndSet` on the pair). The
//! window-search protocol below follows that file's control flow as directly as safe Rust
//! allows: "while marked: CAS past it, retry window search on failure" collapses into a single
//! loop that re-checks the (possibly advanced) `curr` each iteration instead of a separate nested
//! `while`.
//!
//! A marked node's successor pointer is never mutated after the mark; only a predecessor's
//! link is ever CAS-swung past a marked node, and always with `expected_mark = false` on that
//! predecessor's own link, so a concurrent mutation of `pred` itself correctly fails the CAS and
//! restarts the search.

use std::sync::atomic::Ordering;

use crossbeam_epoch::{pin, unprotected, Atomic, Guard, Owned, Shared};
use crossbeam_utils::Backoff;

use crate::adt::{debug_assert_in_range, ConcurrentSet};
use crate::markable_ref::MarkableAtomic;

#[derive(Debug)]
struct Node {
    value: i64,
    // The markable reference: `next.get_mark()` means "this node is logically deleted".
    next: MarkableAtomic<Node>,
}

impl Node {
    /// A node already linking to an existing, reachable successor (used by `insert`).
    fn linking(value: i64, next: Shared<'_, Node>) -> Owned<Self> {
        Owned::new(Self {
            value,
            next: MarkableAtomic::from_shared(next, false),
        })
    }

    /// A freshly allocated sentinel, owning its own (possibly null) successor.
    fn sentinel(value: i64, next: Owned<Node>, mark: bool) -> Owned<Self> {
        Owned::new(Self {
            value,
            next: MarkableAtomic::new(next, mark),
        })
    }
}

/// Concurrent sorted `i64` set with no locks anywhere: `insert`/`remove` are lock-free, `contains`
/// is wait-free.
#[derive(Debug)]
pub struct NonBlockingSet {
    head: Atomic<Node>,
}

impl NonBlockingSet {
    /// Creates a new, empty set (containing only the sentinels).
    pub fn new() -> Self {
        // TAIL.next is a valid markable reference to a null referent. `find_window`/`contains`
        // never dereference it because `TAIL.value = MAX` always satisfies the
        // `curr.value >= target` exit before advancing past `TAIL`.
        let tail = {
            // A sentinel that owns a *null* `Atomic<Node>` next — there is no existing node to
            // link to, so this uses the plain allocator form, not `MarkableAtomic::from_shared`.
            Owned::new(Node {
                value: i64::MAX,
                next: MarkableAtomic::null(),
            })
        };
        let head = Node::sentinel(i64::MIN, tail, false);
        Self {
            head: Atomic::from(head),
        }
    }

    /// Returns `(pred, curr)` such that at some point during the search both were adjacent,
    /// unmarked, and `curr.value >= target`. Cooperatively unlinks any marked node it passes over
    /// along the way.
    fn find_window<'g>(&'g self, target: i64, guard: &'g Guard) -> (Shared<'g, Node>, Shared<'g, Node>) {
        'retry: loop {
            // SAFETY: head is permanently allocated for the lifetime of `self`.
            let mut pred = self.head.load(Ordering::Acquire, guard);
            let mut pred_ref = unsafe { pred.deref() };
            let mut curr = pred_ref.next.get_ref(guard);
            loop {
                let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
                let (succ, marked) = curr_ref.next.get_both(guard);
                if marked {
                    match pred_ref.next.compare_and_set(curr, succ, false, false, guard) {
                        Ok(_) => {
                            // SAFETY: this CAS is what physically unlinked `curr`; no thread can
                            // reach it through the list again after this point.
                            unsafe { guard.defer_destroy(curr) };
                            curr = succ;
                            continue;
                        }
                        Err(_) => continue 'retry,
                    }
                }
                if curr_ref.value >= target {
                    return (pred, curr);
                }
                pred = curr;
                pred_ref = curr_ref;
                curr = succ;
            }
        }
    }
}

impl Default for NonBlockingSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentSet for NonBlockingSet {
    fn insert(&self, value: i64) -> bool {
        debug_assert_in_range!(value);
        let guard = &pin();
        let backoff = Backoff::new();
        loop {
            let (pred, curr) = self.find_window(value, guard);
            let pred_ref = unsafe { pred.deref() };
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value == value {
                return false;
            }
            let new_node = Node::linking(value, curr).into_shared(guard);
            match pred_ref.next.compare_and_set(curr, new_node, false, false, guard) {
                Ok(_) => return true,
                Err(_) => {
                    // SAFETY: `new_node` was never published (the CAS that would have linked it
                    // failed), so no other thread can hold a reference to it.
                    unsafe { drop(new_node.into_owned()) };
                    backoff.spin();
                }
            }
        }
    }

    fn contains(&self, value: i64) -> bool {
        debug_assert_in_range!(value);
        // Wait-free: a single monotone traversal, no CAS, no retries.
        let guard = &pin();
        let mut curr = self.head.load(Ordering::Acquire, guard);
        loop {
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value >= value {
                return curr_ref.value == value && !curr_ref.next.get_mark(guard);
            }
            curr = curr_ref.next.get_ref(guard);
        }
    }

    fn remove(&self, value: i64) -> bool {
        debug_assert_in_range!(value);
        let guard = &pin();
        let backoff = Backoff::new();
        loop {
            let (pred, curr) = self.find_window(value, guard);
            let pred_ref = unsafe { pred.deref() };
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value != value {
                return false;
            }
            let succ = curr_ref.next.get_ref(guard);
            // Logical delete: the linearization point of a successful removal.
            if curr_ref
                .next
                .compare_and_set(succ, succ, false, true, guard)
                .is_err()
            {
                backoff.spin();
                continue;
            }
            // Best-effort physical unlink. Failure is fine: some later traversal's
            // `find_window` will finish the job cooperatively.
            if pred_ref
                .next
                .compare_and_set(curr, succ, false, false, guard)
                .is_ok()
            {
                // SAFETY: this CAS physically unlinked `curr`.
                unsafe { guard.defer_destroy(curr) };
            }
            return true;
        }
    }
}

impl Drop for NonBlockingSet {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no concurrent access is possible.
        unsafe {
            let guard = unprotected();
            let mut curr = self.head.load(Ordering::Relaxed, guard);
            while !curr.is_null() {
                let next = curr.deref().next.get_ref(guard);
                drop(curr.into_owned());
                curr = next;
            }
        }
    }
}

#[cfg(test)]
impl NonBlockingSet {
    /// Internal-only sorted walk of live (unmarked) values, used by tests to check sortedness and
    /// uniqueness after a concurrent history. Not part of the public API: iteration is
    /// deliberately not exposed.
    pub(crate) fn debug_items(&self) -> Vec<i64> {
        let guard = &pin();
        let mut out = Vec::new();
        let mut curr = self.head.load(Ordering::Acquire, guard);
        loop {
            let curr_ref = unsafe { curr.as_ref() }.expect("chain terminates in the MAX sentinel");
            if curr_ref.value != i64::MIN && curr_ref.value != i64::MAX && !curr_ref.next.get_mark(guard) {
                out.push(curr_ref.value);
            }
            if curr_ref.value == i64::MAX {
                return out;
            }
            curr = curr_ref.next.get_ref(guard);
        }
    }
}
