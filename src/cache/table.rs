//! In-memory counter table and its dirty set.
//!
//! Both halves live in one struct so a single lock guards them together.
//! All operations take the current instant explicitly; the caller decides
//! which clock reading a whole operation observes.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::counters::CounterEntry;

#[derive(Debug, Default)]
pub struct CounterTable {
    entries: HashMap<String, CounterEntry>,
    dirty: HashSet<String>,
}

impl CounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry read from the remote store. Loaded entries start clean.
    pub fn insert_loaded(&mut self, key: String, entry: CounterEntry) {
        self.entries.insert(key, entry);
    }

    /// Bump `key` by one, resetting missing or expired entries first.
    ///
    /// Returns the post-increment value and marks the key dirty. A counter
    /// already at `i64::MAX` stays there.
    pub fn increment(&mut self, key: &str, now: Instant, ttl: Duration) -> i64 {
        let entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CounterEntry::fresh(now, ttl));
        if entry.is_expired(now) {
            *entry = CounterEntry::fresh(now, ttl);
        }
        entry.value = entry.value.saturating_add(1);
        let value = entry.value;
        self.dirty.insert(key.to_string());
        value
    }

    /// Stored value for `key`, or zero when absent.
    ///
    /// Expiry is not consulted: an expired entry keeps reporting its value
    /// until a reconciliation pass evicts it.
    pub fn value(&self, key: &str) -> i64 {
        self.entries.get(key).map_or(0, |entry| entry.value)
    }

    pub fn entry(&self, key: &str) -> Option<&CounterEntry> {
        self.entries.get(key)
    }

    pub fn evict(&mut self, key: &str) -> Option<CounterEntry> {
        self.entries.remove(key)
    }

    /// Dirty keys in a stable order.
    pub fn dirty_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.dirty.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.dirty.contains(key)
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty.len()
    }

    /// Replace the dirty set with an empty one.
    pub fn clear_dirty(&mut self) {
        self.dirty = HashSet::new();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn first_increment_creates_entry_and_marks_dirty() {
        let mut table = CounterTable::new();
        let now = Instant::now();

        assert_eq!(table.increment("counter_a", now, TTL), 1);
        assert_eq!(table.increment("counter_a", now, TTL), 2);
        assert!(table.is_dirty("counter_a"));
        assert_eq!(table.entry("counter_a").map(|e| e.expiry), Some(now + TTL));
    }

    #[tokio::test(start_paused = true)]
    async fn increment_resets_expired_entry() {
        let mut table = CounterTable::new();
        let start = Instant::now();
        table.increment("counter_a", start, TTL);
        table.increment("counter_a", start, TTL);

        let later = start + TTL;
        assert_eq!(table.increment("counter_a", later, TTL), 1);
        assert_eq!(
            table.entry("counter_a").map(|e| e.expiry),
            Some(later + TTL)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn value_ignores_expiry() {
        let mut table = CounterTable::new();
        let start = Instant::now();
        table.increment("counter_a", start, TTL);
        table.increment("counter_a", start, TTL);

        assert!(
            table
                .entry("counter_a")
                .is_some_and(|e| e.is_expired(start + TTL * 2))
        );
        assert_eq!(table.value("counter_a"), 2);
        assert_eq!(table.value("counter_missing"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_entries_are_clean() {
        let mut table = CounterTable::new();
        let now = Instant::now();
        table.insert_loaded("counter_a".into(), CounterEntry::restored(9, now, TTL));

        assert_eq!(table.value("counter_a"), 9);
        assert_eq!(table.dirty_len(), 0);
        assert_eq!(table.increment("counter_a", now, TTL), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn increment_saturates_at_max() {
        let mut table = CounterTable::new();
        let now = Instant::now();
        table.insert_loaded(
            "counter_a".into(),
            CounterEntry::restored(i64::MAX, now, TTL),
        );

        assert_eq!(table.increment("counter_a", now, TTL), i64::MAX);
        assert_eq!(table.increment("counter_a", now, TTL), i64::MAX);
        assert_eq!(table.value("counter_a"), i64::MAX);
        assert!(table.is_dirty("counter_a"));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_dirty_keeps_entries() {
        let mut table = CounterTable::new();
        let now = Instant::now();
        table.increment("counter_b", now, TTL);
        table.increment("counter_a", now, TTL);

        assert_eq!(table.dirty_keys(), vec!["counter_a", "counter_b"]);
        table.clear_dirty();
        assert_eq!(table.dirty_len(), 0);
        assert_eq!(table.len(), 2);
    }
}
