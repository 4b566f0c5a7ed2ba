//! `loom`-driven exhaustive-interleaving models of two of this crate's locking protocols, run
//! only under `cargo test --features check-loom` (with `RUSTFLAGS="--cfg loom"`, per `loom`'s own
//! requirement that every atomic/lock/thread operation in the modeled code go through its
//! instrumented replacements).
//!
//! This is deliberately *not* loom run directly against [`crate::fine_grained`] or [`crate::lazy`]
//! themselves: those modules use raw pointers and `crossbeam_epoch`, neither of which loom can
//! instrument. Instead, each model below re-expresses the *protocol* those modules implement —
//! two-lock hand-over-hand acquisition order and lazy mark-then-validate — over a tiny, fixed-size
//! list built entirely from `loom::sync` primitives, small enough (2-3 keys) that loom can
//! explore every legal thread interleaving in one test run. A bug here (a missed lock-ordering
//! case, a validate that accepts a torn window) would indicate the same class of bug is possible
//! in the real, pointer-based implementation; this model does not replace the scenario tests in
//! `fine_grained`/`lazy`, which run the real implementation on stock threads instead of an
//! abstracted model of it.

#![cfg(feature = "check-loom")]

use loom::sync::{Mutex, RwLock};
use loom::thread;

/// A 3-node fixed list (`HEAD(MIN) -> A(1) -> TAIL(MAX)`) where every node's `next` link is
/// guarded by its own mutex, modeling the fine-grained set's "lock node X" = "lock X.next"
/// representation.
struct LockedNode {
    value: i64,
    next: Mutex<Option<usize>>,
}

/// Two-lock hand-over-hand traversal to the first index with `value >= target`: lock `HEAD`,
/// lock `HEAD.next`, then repeatedly unlock the trailing node only after the leading one is
/// locked.
fn find(nodes: &[LockedNode], target: i64) -> (usize, usize) {
    let mut pred = 0;
    let mut pred_guard = nodes[pred].next.lock().unwrap();
    let mut curr = pred_guard.expect("chain terminates in the MAX sentinel");
    loop {
        if nodes[curr].value >= target {
            return (pred, curr);
        }
        drop(pred_guard);
        pred = curr;
        pred_guard = nodes[pred].next.lock().unwrap();
        curr = pred_guard.expect("chain terminates in the MAX sentinel");
    }
}

#[test]
fn two_lock_hand_over_hand_never_deadlocks_under_concurrent_find() {
    loom::model(|| {
        let nodes = loom::sync::Arc::new(vec![
            LockedNode { value: i64::MIN, next: Mutex::new(Some(1)) },
            LockedNode { value: 1, next: Mutex::new(Some(2)) },
            LockedNode { value: i64::MAX, next: Mutex::new(None) },
        ]);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let nodes = nodes.clone();
                thread::spawn(move || {
                    let (pred, curr) = find(&nodes, 1);
                    assert!(nodes[pred].value < 1);
                    assert!(nodes[curr].value >= 1);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
    });
}

/// Models the lazy set's validation predicate in isolation: `!pred.marked && !curr.marked &&
/// pred.next == curr`, guarded by an `RwLock<bool>` pair standing in for each node's per-node
/// mutex plus `marked` flag. Checks that a thread which observes `validate() == true` also
/// observes a `pred.next` that still equals the `curr` it validated against, under a concurrent
/// marker.
#[test]
fn lazy_validate_never_accepts_a_torn_window() {
    loom::model(|| {
        let pred_marked = loom::sync::Arc::new(RwLock::new(false));
        let pred_next = loom::sync::Arc::new(Mutex::new(1usize));
        let curr_marked = loom::sync::Arc::new(RwLock::new(false));

        // A racing validator: every read it performs is a snapshot that must be self-consistent
        // with the validation predicate, regardless of how the remover's two writes below
        // interleave with it.
        let validator = {
            let pred_marked = pred_marked.clone();
            let pred_next = pred_next.clone();
            let curr_marked = curr_marked.clone();
            thread::spawn(move || {
                let valid = !*pred_marked.read().unwrap()
                    && !*curr_marked.read().unwrap()
                    && *pred_next.lock().unwrap() == 1;
                // A window can only validate while `curr` is still reachable at `pred.next == 1`
                // *and* unmarked: the remover's own order (mark, then swing) guarantees there is
                // no interleaving in which `curr` is marked while `pred.next` still equals 1 AND
                // the validator also reads `curr_marked == false` — marking happens-before the
                // swing, so any validator that reads the pre-swing `pred.next` must also read the
                // pre-mark `curr_marked`, or the post-mark value of both.
                if valid {
                    assert_eq!(*pred_next.lock().unwrap() == 1, !*curr_marked.read().unwrap());
                }
            })
        };

        // Removal order: mark curr, *then* swing pred.next. Reordering these two writes is
        // exactly the bug this model is built to catch.
        *curr_marked.write().unwrap() = true;
        *pred_next.lock().unwrap() = 2;
        let _ = pred_marked.read().unwrap();

        validator.join().unwrap();
    });
}
