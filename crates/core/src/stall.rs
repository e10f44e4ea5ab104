//! Stuck-job detection for the polling loop.
//!
//! A record dispatched to a backend normally leaves the pending set
//! within a few poll cycles, once its output appears and the filename
//! is reported. A record that keeps showing up as rendering/needs-retry
//! has lost its output (crashed backend, deleted file) and would
//! otherwise be re-checked forever.

use std::collections::HashMap;

use crate::types::PromptId;

/// Number of sightings in an in-flight state before a record is
/// declared stalled and failed.
pub const DEFAULT_STALL_THRESHOLD: u32 = 20;

/// Tracks how many times each in-flight record has been seen.
///
/// Purely in-memory: a worker restart resets all counters, which is
/// acceptable — the record just gets another full round of sightings.
#[derive(Debug)]
pub struct StallTracker {
    threshold: u32,
    sightings: HashMap<PromptId, u32>,
}

impl StallTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            sightings: HashMap::new(),
        }
    }

    /// Record one sighting of an in-flight record. Returns `true` when
    /// the record has now exceeded the threshold; the caller should mark
    /// it failed. The counter is dropped at that point so a later retry
    /// of the same id starts fresh.
    pub fn record_sighting(&mut self, id: PromptId) -> bool {
        let count = self.sightings.entry(id).or_insert(0);
        *count += 1;
        if *count > self.threshold {
            self.sightings.remove(&id);
            true
        } else {
            false
        }
    }

    /// Forget a record that completed or failed through the normal path.
    pub fn clear(&mut self, id: PromptId) {
        self.sightings.remove(&id);
    }

    /// Number of records currently being tracked.
    pub fn tracked(&self) -> usize {
        self.sightings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_past_threshold() {
        let mut tracker = StallTracker::new(3);
        assert!(!tracker.record_sighting(1));
        assert!(!tracker.record_sighting(1));
        assert!(!tracker.record_sighting(1));
        assert!(tracker.record_sighting(1));
    }

    #[test]
    fn counter_resets_after_firing() {
        let mut tracker = StallTracker::new(2);
        tracker.record_sighting(5);
        tracker.record_sighting(5);
        assert!(tracker.record_sighting(5));
        // fresh round after firing
        assert!(!tracker.record_sighting(5));
        assert_eq!(tracker.tracked(), 1);
    }

    #[test]
    fn ids_tracked_independently() {
        let mut tracker = StallTracker::new(1);
        assert!(!tracker.record_sighting(1));
        assert!(!tracker.record_sighting(2));
        assert!(tracker.record_sighting(1));
        assert!(tracker.record_sighting(2));
    }

    #[test]
    fn clear_forgets_record() {
        let mut tracker = StallTracker::new(1);
        tracker.record_sighting(9);
        tracker.clear(9);
        assert_eq!(tracker.tracked(), 0);
        assert!(!tracker.record_sighting(9));
    }
}
