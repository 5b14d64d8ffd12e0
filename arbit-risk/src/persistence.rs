use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Per-`(venue, cycle_path)` streak bookkeeping, grounded on `original_source`'s persistence
/// table and spec §3's Persistence Record invariants. `current_streak`/`max_streak` only ever
/// grow within a single observation and both start at 1 on first sight — there is no
/// "0 occurrences" state for a record that exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceRecord {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrences: u64,
    pub current_streak: u64,
    pub max_streak: u64,
    pub last_iteration: u64,
}

impl PersistenceRecord {
    fn first(now: DateTime<Utc>, iteration: u64) -> Self {
        Self {
            first_seen: now,
            last_seen: now,
            occurrences: 1,
            current_streak: 1,
            max_streak: 1,
            last_iteration: iteration,
        }
    }

    /// Applies the re-observation rule (spec §3): consecutive iterations extend the streak,
    /// any gap resets it to 1, `max_streak` never decreases.
    fn observe(&mut self, now: DateTime<Utc>, iteration: u64) {
        self.current_streak = if iteration == self.last_iteration + 1 {
            self.current_streak + 1
        } else {
            1
        };
        self.max_streak = self.max_streak.max(self.current_streak);
        self.occurrences += 1;
        self.last_seen = now;
        self.last_iteration = iteration;
    }
}

/// Key identifying one recurring opportunity shape: a venue plus its rotated cycle path
/// rendered as a string (e.g. `"USDT->BTC->ETH->USDT"`), matching how the detector already
/// dedups rotations before emitting an opportunity.
pub type PersistenceKey = (arbit_instrument::ExchangeId, String);

/// Pure in-memory persistence table (spec §4.5): a single writer (the detection coordinator)
/// updates it once per iteration per emitted opportunity; readers (the reporter, any
/// minimum-streak dispatch policy) only ever call [`PersistenceTracker::get`].
#[derive(Debug, Default)]
pub struct PersistenceTracker {
    records: RwLock<HashMap<PersistenceKey, PersistenceRecord>>,
}

impl PersistenceTracker {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record that `key` was observed again in `iteration`, creating the record on first sight.
    /// Returns the updated record so the caller (typically the reporter) doesn't need a second
    /// lookup.
    pub fn observe(&self, key: PersistenceKey, now: DateTime<Utc>, iteration: u64) -> PersistenceRecord {
        let mut records = self.records.write();
        let record = records
            .entry(key)
            .and_modify(|record| record.observe(now, iteration))
            .or_insert_with(|| PersistenceRecord::first(now, iteration));
        *record
    }

    pub fn get(&self, key: &PersistenceKey) -> Option<PersistenceRecord> {
        self.records.read().get(key).copied()
    }

    /// Whether `key`'s current streak clears `min_streak`, the read-only query a dispatch
    /// policy consults before acting on a repeatedly-seen opportunity.
    pub fn meets_min_streak(&self, key: &PersistenceKey, min_streak: u64) -> bool {
        self.get(key).is_some_and(|record| record.current_streak >= min_streak)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbit_instrument::ExchangeId;

    fn key() -> PersistenceKey {
        (ExchangeId::Binance, "USDT->BTC->ETH->USDT".to_string())
    }
    fn at(seconds: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(seconds, 0).unwrap()
    }

    #[test]
    fn first_observation_starts_streak_at_one() {
        let tracker = PersistenceTracker::new();
        let record = tracker.observe(key(), at(0), 1);
        assert_eq!(record.occurrences, 1);
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.max_streak, 1);
    }

    #[test]
    fn consecutive_iterations_extend_the_streak() {
        let tracker = PersistenceTracker::new();
        tracker.observe(key(), at(0), 1);
        tracker.observe(key(), at(1), 2);
        let record = tracker.observe(key(), at(2), 3);
        assert_eq!(record.current_streak, 3);
        assert_eq!(record.max_streak, 3);
        assert_eq!(record.occurrences, 3);
    }

    #[test]
    fn a_gap_resets_the_current_streak_but_not_the_max() {
        let tracker = PersistenceTracker::new();
        tracker.observe(key(), at(0), 1);
        tracker.observe(key(), at(1), 2);
        tracker.observe(key(), at(2), 3);
        let record = tracker.observe(key(), at(10), 10);
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.max_streak, 3);
        assert_eq!(record.occurrences, 4);
    }

    #[test]
    fn min_streak_gate_reflects_current_streak() {
        let tracker = PersistenceTracker::new();
        tracker.observe(key(), at(0), 1);
        tracker.observe(key(), at(1), 2);
        assert!(!tracker.meets_min_streak(&key(), 3));
        tracker.observe(key(), at(2), 3);
        assert!(tracker.meets_min_streak(&key(), 3));
    }

    #[test]
    fn unknown_key_never_meets_a_streak_requirement() {
        let tracker = PersistenceTracker::new();
        assert!(!tracker.meets_min_streak(&key(), 1));
    }
}
