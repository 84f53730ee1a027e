//! Tally: named counters served from a write-back cache over a remote store.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
