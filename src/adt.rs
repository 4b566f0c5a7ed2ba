//! Abstract data type traits shared by every set variant.

use std::fmt::Debug;

/// A concurrent (or, for [`crate::sequential::SequentialSet`], single-threaded-only) ordered set
/// of `i64`.
///
/// Every variant in this crate implements the same three total operations over shared
/// references, so a caller can swap implementations without touching call sites. See
/// [`crate::SetKind`] for runtime selection.
///
/// Deliberately *not* bounded by `Send + Sync` here: [`crate::sequential::SequentialSet`] is a
/// single-threaded oracle and must not be usable from more than one thread. Call sites that
/// actually spawn threads (the stress harness in [`crate::test::adt::set`], the factory's
/// concurrent scenarios) add `Sync` themselves.
pub trait ConcurrentSet: Debug {
    /// Inserts `value`. Returns `true` if it was not already present.
    ///
    /// `value` must lie strictly between `i64::MIN` and `i64::MAX`; those two values are
    /// reserved for the sentinels (see [`in_range`]).
    fn insert(&self, value: i64) -> bool;

    /// Returns whether `value` is currently a member.
    fn contains(&self, value: i64) -> bool;

    /// Removes `value`. Returns `true` if it was present.
    fn remove(&self, value: i64) -> bool;
}

/// Whether `value` is legal user input, i.e. strictly between the two sentinel values.
///
/// `i64::MIN`/`i64::MAX` are reserved for the sentinels; every variant in this crate calls this
/// at the top of each public operation via [`debug_assert_in_range`].
#[inline]
pub(crate) fn in_range(value: i64) -> bool {
    value > i64::MIN && value < i64::MAX
}

/// Debug-only boundary check shared by every variant's `insert`/`contains`/`remove`.
macro_rules! debug_assert_in_range {
    ($value:expr) => {
        debug_assert!(
            crate::adt::in_range($value),
            "value {} collides with a sentinel (MIN/MAX are reserved)",
            $value
        );
    };
}

pub(crate) use debug_assert_in_range;
