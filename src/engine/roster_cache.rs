use std::collections::VecDeque;

use crate::constants::{ROSTER_RETENTION_MS, ROSTER_SNAPSHOT_INTERVAL_MS};
use crate::types::{Faction, PlayerSnapshot, RosterSnapshot};

#[derive(Clone, Copy, Debug)]
pub struct RosterCacheOptions {
    pub snapshot_interval_ms: u64,
    pub retention_ms: u64,
}

impl Default for RosterCacheOptions {
    fn default() -> Self {
        Self {
            snapshot_interval_ms: ROSTER_SNAPSHOT_INTERVAL_MS,
            retention_ms: ROSTER_RETENTION_MS,
        }
    }
}

/// Time-ordered queue of roster snapshots, oldest first. The front snapshot is
/// the "reference" roster: what the match looked like roughly `retention_ms`
/// ago. Capture rewards are computed from it rather than from the live roster,
/// so leaving the match seconds before a capture changes nothing.
pub struct RosterCache {
    options: RosterCacheOptions,
    snapshots: VecDeque<RosterSnapshot>,
    last_refresh_ms: Option<u64>,
}

impl RosterCache {
    pub fn new(options: RosterCacheOptions) -> Self {
        Self {
            options,
            snapshots: VecDeque::new(),
            last_refresh_ms: None,
        }
    }

    /// Appends a snapshot when the configured cadence has elapsed. The very
    /// first call always snapshots. Returns whether a snapshot was taken.
    pub fn maybe_refresh(&mut self, now_ms: u64, roster: Vec<PlayerSnapshot>) -> bool {
        let due = match self.last_refresh_ms {
            None => true,
            Some(at) => now_ms.saturating_sub(at) >= self.options.snapshot_interval_ms,
        };
        if !due {
            return false;
        }
        self.snapshots.push_back(RosterSnapshot {
            at_ms: now_ms,
            players: roster,
        });
        self.last_refresh_ms = Some(now_ms);
        true
    }

    /// Drops expired snapshots from the front. The last remaining snapshot is
    /// never evicted, even when stale, so the cache stays usable until the
    /// refresh cadence produces a replacement.
    pub fn evict_expired(&mut self, now_ms: u64) {
        while self.snapshots.len() > 1 {
            let front_at = match self.snapshots.front() {
                Some(snapshot) => snapshot.at_ms,
                None => return,
            };
            if now_ms.saturating_sub(front_at) > self.options.retention_ms {
                self.snapshots.pop_front();
            } else {
                break;
            }
        }
    }

    /// Oldest retained snapshot. `None` only before the first refresh ever.
    pub fn reference(&self) -> Option<&RosterSnapshot> {
        self.snapshots.front()
    }

    pub fn count_in_faction(&self, faction: Faction) -> usize {
        self.reference()
            .map(|snapshot| snapshot.count_in_faction(faction))
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.snapshots.len()
    }
}
