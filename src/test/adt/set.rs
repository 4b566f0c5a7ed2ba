//! Differential and log-consistency stress harness for [`crate::ConcurrentSet`] implementations.
//!
//! Grounded on the coursework's own `test::adt::set` (`stress_sequential`, `stress_concurrent`,
//! `log_concurrent`), narrowed from a generic `ConcurrentSet<K: RandGen>` to this crate's
//! monomorphic `i64` set: there is only one key type here, so the harness generates values
//! directly with `rand` instead of going through a `RandGen` trait. `stress_sequential` is a
//! general-purpose single-threaded differential test against `std::collections::HashSet`;
//! `stress_concurrent` is a panic/deadlock smoke test with no result checking; `log_concurrent`
//! records a per-thread operation log and checks it with a cheap aggregate consistency check that
//! scales to large logs; [`linearizability_check`] is the stronger, exponential-time check that
//! actually replays a log against a [`crate::sequential::SequentialSet`] oracle, and is only run
//! at small scale for that reason.

use std::collections::{HashMap, HashSet};
use std::thread;

use rand::prelude::*;

use crate::adt::ConcurrentSet;
use crate::sequential::SequentialSet;

/// Values are drawn from a small range so that concurrent runs produce plenty of genuine
/// contention (repeated inserts/removes/contains on the same handful of keys) rather than
/// scattering across the whole `i64` domain.
const VALUE_RANGE: std::ops::Range<i64> = 1..1000;

/// Range used by [`linearizability_check`]: small enough that the oracle-replay search below
/// stays tractable.
const SMALL_VALUE_RANGE: std::ops::Range<i64> = 1..4;

fn rand_value_in(range: std::ops::Range<i64>, rng: &mut impl Rng) -> i64 {
    rng.gen_range(range)
}

fn rand_value(rng: &mut impl Rng) -> i64 {
    rand_value_in(VALUE_RANGE, rng)
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Contains,
    Insert,
    Remove,
}

const OPS: [Op; 3] = [Op::Contains, Op::Insert, Op::Remove];

/// Runs `steps` random operations against a fresh `S` in a single thread, checking every result
/// against a `std::collections::HashSet<i64>` reference model. Any mismatch between `set` and
/// `model` is a linearizability violation even without concurrency.
pub fn stress_sequential<S: Default + ConcurrentSet>(steps: usize) {
    #[derive(Debug, Clone, Copy)]
    enum SeqOp {
        ContainsPresent,
        ContainsAbsent,
        Insert,
        RemovePresent,
        RemoveAbsent,
    }
    const SEQ_OPS: [SeqOp; 5] = [
        SeqOp::ContainsPresent,
        SeqOp::ContainsAbsent,
        SeqOp::Insert,
        SeqOp::RemovePresent,
        SeqOp::RemoveAbsent,
    ];

    let mut rng = thread_rng();
    let set = S::default();
    let mut model = HashSet::<i64>::new();

    for i in 0..steps {
        match *SEQ_OPS.choose(&mut rng).unwrap() {
            SeqOp::ContainsPresent => {
                if let Some(&v) = model.iter().choose(&mut rng) {
                    assert_eq!(set.contains(v), model.contains(&v), "step {i}: contains({v})");
                }
            }
            SeqOp::ContainsAbsent => {
                let v = rand_value(&mut rng);
                assert_eq!(set.contains(v), model.contains(&v), "step {i}: contains({v})");
            }
            SeqOp::Insert => {
                let v = rand_value(&mut rng);
                assert_eq!(set.insert(v), model.insert(v), "step {i}: insert({v})");
            }
            SeqOp::RemovePresent => {
                let v = model.iter().choose(&mut rng).copied();
                if let Some(v) = v {
                    assert_eq!(set.remove(v), model.remove(&v), "step {i}: remove({v})");
                }
            }
            SeqOp::RemoveAbsent => {
                let v = rand_value(&mut rng);
                assert_eq!(set.remove(v), model.remove(&v), "step {i}: remove({v})");
            }
        }
    }
}

/// Randomly runs `steps` operations per thread across `threads` threads concurrently, with no
/// correctness check beyond "doesn't panic/deadlock" — useful when the caller doesn't need a
/// log. Prefer [`log_concurrent`] when the result needs to be checked.
pub fn stress_concurrent<S: Default + Sync + ConcurrentSet>(threads: usize, steps: usize) {
    let set = S::default();
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                let mut rng = thread_rng();
                for _ in 0..steps {
                    let v = rand_value(&mut rng);
                    match *OPS.choose(&mut rng).unwrap() {
                        Op::Contains => {
                            let _ = set.contains(v);
                        }
                        Op::Insert => {
                            let _ = set.insert(v);
                        }
                        Op::Remove => {
                            let _ = set.remove(v);
                        }
                    }
                }
            });
        }
    });
}

#[derive(Debug, Clone, Copy)]
enum LogEntry {
    Contains { value: i64, result: bool },
    Insert { value: i64, result: bool },
    Remove { value: i64, result: bool },
}

/// Runs `steps` random operations per thread across `threads` threads concurrently, drawing
/// values from `value_range`, and returns each thread's own recorded operations and results in
/// program order.
fn run_logged<S: Default + Sync + ConcurrentSet>(
    threads: usize,
    steps: usize,
    value_range: std::ops::Range<i64>,
) -> Vec<Vec<LogEntry>> {
    let set = S::default();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(|| {
                    let mut rng = thread_rng();
                    let mut log = Vec::with_capacity(steps);
                    for _ in 0..steps {
                        let value = rand_value_in(value_range.clone(), &mut rng);
                        let entry = match *OPS.choose(&mut rng).unwrap() {
                            Op::Contains => LogEntry::Contains { value, result: set.contains(value) },
                            Op::Insert => LogEntry::Insert { value, result: set.insert(value) },
                            Op::Remove => LogEntry::Remove { value, result: set.remove(value) },
                        };
                        log.push(entry);
                    }
                    log
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Randomly runs `steps` operations per thread across `threads` threads concurrently, recording
/// each thread's own operations and results, then checks the combined log with the cheap
/// aggregate consistency check in [`assert_log_consistent`]. Scales to large logs; does not
/// verify full linearizability (see [`linearizability_check`] for that).
pub fn log_concurrent<S: Default + Sync + ConcurrentSet>(threads: usize, steps: usize) {
    let logs = run_logged::<S>(threads, steps, VALUE_RANGE);
    assert_log_consistent(&logs);
}

/// If `contains(v)` ever returned `true`, some `insert(v)` must have succeeded first. If
/// `remove(v)` succeeded `k` times, `insert(v)` must have succeeded at least `k` times —
/// otherwise some removal invented a membership no insert ever established.
///
/// This is a cheap *necessary* condition, not a full linearizability check: it only compares
/// aggregate per-key counts and does not verify that the recorded history admits some total
/// order consistent with every operation's return value. It scales to the large logs
/// [`log_concurrent`] generates. [`linearizability_check`] is the stronger, much more expensive
/// check that actually searches for such an order.
fn assert_log_consistent(logs: &[Vec<LogEntry>]) {
    let mut successful_inserts: HashMap<i64, usize> = HashMap::new();
    let mut successful_removes: HashMap<i64, usize> = HashMap::new();
    let mut observed_present: HashSet<i64> = HashSet::new();

    for log in logs {
        for entry in log {
            match *entry {
                LogEntry::Insert { value, result: true } => {
                    *successful_inserts.entry(value).or_insert(0) += 1;
                }
                LogEntry::Remove { value, result: true } => {
                    *successful_removes.entry(value).or_insert(0) += 1;
                }
                LogEntry::Contains { value, result: true } => {
                    observed_present.insert(value);
                }
                _ => {}
            }
        }
    }

    for value in &observed_present {
        assert!(
            successful_inserts.contains_key(value),
            "contains({value}) returned true but no insert({value}) ever succeeded"
        );
    }

    for (value, removed) in &successful_removes {
        let inserted = successful_inserts.get(value).copied().unwrap_or(0);
        assert!(
            inserted >= *removed,
            "value {value} was removed successfully {removed} times but only inserted {inserted} times"
        );
    }
}

/// Runs a small concurrent log (few threads, few steps, a narrow value range) and asserts it is
/// linearizable: that some total order of the recorded operations — each thread's own operations
/// kept in their original program order — replays against a fresh [`SequentialSet`] oracle and
/// reproduces every recorded return value exactly. This is the actual oracle-replay check; kept
/// at small scale because the search below is exponential in the log length.
pub fn linearizability_check<S: Default + Sync + ConcurrentSet>(threads: usize, steps: usize) {
    let logs = run_logged::<S>(threads, steps, SMALL_VALUE_RANGE);
    assert!(
        is_linearizable(&logs),
        "recorded operation log admits no linearization consistent with a sequential oracle: {logs:?}"
    );
}

/// Wing-Gong style linearizability check: memoized backtracking search over interleavings of
/// `logs` (each thread's entries kept in order) that, replayed against a [`SequentialSet`],
/// reproduce every recorded result. Memoizes on `(per-thread cursor, oracle snapshot)` so that
/// interleavings reaching an already-explored state are pruned.
fn is_linearizable(logs: &[Vec<LogEntry>]) -> bool {
    let mut oracle = SequentialSet::new();
    let mut memo: HashSet<(Vec<usize>, Vec<i64>)> = HashSet::new();
    let cursors = vec![0usize; logs.len()];
    search(logs, cursors, &mut oracle, &mut memo)
}

fn search(
    logs: &[Vec<LogEntry>],
    cursors: Vec<usize>,
    oracle: &mut SequentialSet,
    memo: &mut HashSet<(Vec<usize>, Vec<i64>)>,
) -> bool {
    if cursors.iter().zip(logs).all(|(&c, log)| c == log.len()) {
        return true;
    }

    let key = (cursors.clone(), oracle.debug_items());
    if memo.contains(&key) {
        return false;
    }
    memo.insert(key);

    for (t, log) in logs.iter().enumerate() {
        if cursors[t] == log.len() {
            continue;
        }
        let entry = log[cursors[t]];
        let applied = match entry {
            LogEntry::Insert { value, result } => {
                let predicted = !oracle.contains(value);
                (predicted == result, result)
            }
            LogEntry::Remove { value, result } => {
                let predicted = oracle.contains(value);
                (predicted == result, result)
            }
            LogEntry::Contains { value, result } => (oracle.contains(value) == result, false),
        };
        let (matches, mutated) = applied;
        if !matches {
            continue;
        }
        if mutated {
            match entry {
                LogEntry::Insert { value, .. } => {
                    oracle.insert(value);
                }
                LogEntry::Remove { value, .. } => {
                    oracle.remove(value);
                }
                LogEntry::Contains { .. } => unreachable!("contains never mutates"),
            }
        }

        let mut next_cursors = cursors.clone();
        next_cursors[t] += 1;
        if search(logs, next_cursors, oracle, memo) {
            return true;
        }

        if mutated {
            match entry {
                LogEntry::Insert { value, .. } => {
                    oracle.remove(value);
                }
                LogEntry::Remove { value, .. } => {
                    oracle.insert(value);
                }
                LogEntry::Contains { .. } => unreachable!("contains never mutates"),
            }
        }
    }

    false
}
