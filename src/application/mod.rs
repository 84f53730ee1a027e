//! Application services layer.

pub mod counters;
pub mod error;
pub mod store;
