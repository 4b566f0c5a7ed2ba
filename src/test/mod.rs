//! Test-only infrastructure shared by every variant's own `#[cfg(test)] mod tests` block.
//!
//! Grounded on the coursework's own `test` module (generic-key `stress_sequential` /
//! `stress_concurrent` / `log_concurrent` harness), narrowed from a generic `ConcurrentSet<K>`
//! to this crate's monomorphic `i64` [`crate::ConcurrentSet`].

pub mod adt;
