//! Domain layer types and invariants.

pub mod counters;
pub mod error;
