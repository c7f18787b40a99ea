use std::collections::HashMap;

use crate::constants::QUITTER_MEMORY_MS;

#[derive(Clone, Copy, Debug)]
pub struct QuitterTrackerOptions {
    pub memory_ms: u64,
}

impl Default for QuitterTrackerOptions {
    fn default() -> Self {
        Self {
            memory_ms: QUITTER_MEMORY_MS,
        }
    }
}

#[derive(Clone, Debug)]
pub struct QuitterRecord {
    pub callsign: String,
    pub departed_at_ms: u64,
}

/// Remembers players who vanished from the captured faction right before a
/// capture, keyed by network identity so a callsign change on rejoin does not
/// dodge the call-out. Expired records are purged lazily on lookup.
pub struct QuitterTracker {
    options: QuitterTrackerOptions,
    records: HashMap<String, QuitterRecord>,
}

impl QuitterTracker {
    pub fn new(options: QuitterTrackerOptions) -> Self {
        Self {
            options,
            records: HashMap::new(),
        }
    }

    /// Records a departure. Idempotent: a second insert for the same network
    /// identity before expiry keeps the first record. Returns whether a new
    /// record was created.
    pub fn record(&mut self, now_ms: u64, network_id: &str, callsign: &str) -> bool {
        if self.records.contains_key(network_id) {
            return false;
        }
        self.records.insert(
            network_id.to_string(),
            QuitterRecord {
                callsign: callsign.to_string(),
                departed_at_ms: now_ms,
            },
        );
        true
    }

    /// The callsign the identity departed under, while the record is still
    /// inside the memory window. An expired record is removed here.
    pub fn lookup(&mut self, now_ms: u64, network_id: &str) -> Option<String> {
        let record = self.records.get(network_id)?;
        if now_ms.saturating_sub(record.departed_at_ms) >= self.options.memory_ms {
            self.records.remove(network_id);
            return None;
        }
        Some(record.callsign.clone())
    }

    /// Removes the record once its disclosure has been made.
    pub fn consume(&mut self, network_id: &str) -> Option<QuitterRecord> {
        self.records.remove(network_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(memory_ms: u64) -> QuitterTracker {
        QuitterTracker::new(QuitterTrackerOptions { memory_ms })
    }

    #[test]
    fn record_is_idempotent_per_network_identity() {
        let mut tracker = tracker(60_000);
        assert!(tracker.record(1_000, "10.0.0.1", "Alice"));
        assert!(!tracker.record(2_000, "10.0.0.1", "Alias"));

        // The first departure wins, callsign included.
        assert_eq!(tracker.lookup(3_000, "10.0.0.1").as_deref(), Some("Alice"));
    }

    #[test]
    fn lookup_within_window_returns_departure_callsign() {
        let mut tracker = tracker(60_000);
        tracker.record(0, "10.0.0.1", "Alice");
        assert_eq!(tracker.lookup(59_999, "10.0.0.1").as_deref(), Some("Alice"));
    }

    #[test]
    fn expired_record_is_purged_on_lookup() {
        let mut tracker = tracker(60_000);
        tracker.record(0, "10.0.0.1", "Alice");
        assert_eq!(tracker.lookup(60_000, "10.0.0.1"), None);

        // Purged, so a later in-window lookup finds nothing either.
        assert_eq!(tracker.lookup(100, "10.0.0.1"), None);
    }

    #[test]
    fn consume_removes_exactly_once() {
        let mut tracker = tracker(60_000);
        tracker.record(0, "10.0.0.1", "Alice");
        assert!(tracker.consume("10.0.0.1").is_some());
        assert!(tracker.consume("10.0.0.1").is_none());
        assert_eq!(tracker.lookup(100, "10.0.0.1"), None);
    }

    #[test]
    fn unknown_identity_is_not_an_error() {
        let mut tracker = tracker(60_000);
        assert_eq!(tracker.lookup(0, "10.9.9.9"), None);
        assert!(tracker.consume("10.9.9.9").is_none());
    }
}
