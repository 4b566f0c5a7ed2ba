//! Abstract-data-type test harnesses, one per ADT family. This crate has exactly one: sets.

pub mod set;
