use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MatchSummary, StandingEntry, StandingsResponse};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredStandingEntry {
    callsign: String,
    matches: u64,
    captures: u64,
    #[serde(rename = "pointsWon", alias = "points_won")]
    points_won: u64,
    #[serde(rename = "pointsLost", alias = "points_lost")]
    points_lost: u64,
    #[serde(rename = "bestNet", alias = "best_net")]
    best_net: i64,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms")]
    updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StandingsStoreFile {
    version: u8,
    players: HashMap<String, StoredStandingEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct StandingsStoreFileRaw {
    version: u8,
    players: HashMap<String, serde_json::Value>,
}

/// Cross-match standings persisted as versioned JSON. Loading is forgiving:
/// a missing file starts empty, and malformed player entries are skipped
/// without discarding the rest of the file.
pub struct StandingsStore {
    file_path: PathBuf,
    players: HashMap<String, StoredStandingEntry>,
}

impl StandingsStore {
    pub fn new(file_path: PathBuf) -> Self {
        let players = load_players(&file_path);
        Self { file_path, players }
    }

    pub fn record_match(&mut self, summary: &MatchSummary) {
        let now_ms = now_ms();

        for tally in &summary.tally {
            let key = standings_key(&tally.callsign);
            if key.is_empty() {
                continue;
            }
            let current = self
                .players
                .entry(key)
                .or_insert_with(|| StoredStandingEntry {
                    callsign: tally.callsign.trim().to_string(),
                    matches: 0,
                    captures: 0,
                    points_won: 0,
                    points_lost: 0,
                    best_net: i64::MIN,
                    updated_at_ms: now_ms,
                });

            current.callsign = tally.callsign.trim().to_string();
            current.matches += 1;
            current.captures += tally.captures as u64;
            current.points_won += tally.points_won as u64;
            current.points_lost += tally.points_lost as u64;
            current.best_net = current.best_net.max(tally.net);
            current.updated_at_ms = now_ms;
        }

        self.save();
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> StandingsResponse {
        StandingsResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.get_top(requested_limit),
        }
    }

    fn get_top(&self, requested_limit: Option<usize>) -> Vec<StandingEntry> {
        let normalized_limit = requested_limit.unwrap_or(10).clamp(1, 100);
        let mut entries: Vec<StandingEntry> = self
            .players
            .values()
            .map(|entry| StandingEntry {
                callsign: entry.callsign.clone(),
                matches: entry.matches,
                captures: entry.captures,
                points_won: entry.points_won,
                points_lost: entry.points_lost,
                net_total: entry.points_won as i64 - entry.points_lost as i64,
                best_net: entry.best_net,
                updated_at_ms: entry.updated_at_ms,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.net_total
                .cmp(&a.net_total)
                .then_with(|| b.captures.cmp(&a.captures))
                .then_with(|| b.best_net.cmp(&a.best_net))
                .then_with(|| a.callsign.to_lowercase().cmp(&b.callsign.to_lowercase()))
        });
        entries.truncate(normalized_limit);
        entries
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                eprintln!(
                    "[standings-store] failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }

        let payload = StandingsStoreFile {
            version: 1,
            players: self.players.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    eprintln!(
                        "[standings-store] failed to write {}: {error}",
                        self.file_path.display()
                    );
                }
            }
            Err(error) => {
                eprintln!(
                    "[standings-store] failed to serialize payload for {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }
}

fn load_players(path: &Path) -> HashMap<String, StoredStandingEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                eprintln!(
                    "[standings-store] failed to read {}: {error}",
                    path.display()
                );
            }
            return HashMap::new();
        }
    };
    let parsed: StandingsStoreFileRaw = match serde_json::from_str::<StandingsStoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            eprintln!(
                "[standings-store] unsupported version {} at {}",
                value.version,
                path.display()
            );
            return HashMap::new();
        }
        Err(error) => {
            eprintln!(
                "[standings-store] failed to parse {}: {error}",
                path.display()
            );
            return HashMap::new();
        }
    };

    let mut sanitized = HashMap::<String, StoredStandingEntry>::new();
    for (player_key, raw_value) in parsed.players {
        let value: StoredStandingEntry = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                eprintln!(
                    "[standings-store] failed to parse player entry '{}' in {}: {error}",
                    player_key,
                    path.display()
                );
                continue;
            }
        };
        let Some(normalized) = sanitize_stored_entry(value) else {
            continue;
        };
        let key = standings_key(&normalized.callsign);
        if key.is_empty() {
            continue;
        }

        match sanitized.get_mut(&key) {
            Some(current) => {
                current.callsign = normalized.callsign;
                current.matches += normalized.matches;
                current.captures += normalized.captures;
                current.points_won += normalized.points_won;
                current.points_lost += normalized.points_lost;
                current.best_net = current.best_net.max(normalized.best_net);
                current.updated_at_ms = current.updated_at_ms.max(normalized.updated_at_ms);
            }
            None => {
                sanitized.insert(key, normalized);
            }
        }
    }

    sanitized
}

fn sanitize_stored_entry(value: StoredStandingEntry) -> Option<StoredStandingEntry> {
    let normalized_callsign = value.callsign.trim().to_string();
    if normalized_callsign.is_empty() {
        return None;
    }
    Some(StoredStandingEntry {
        callsign: normalized_callsign,
        ..value
    })
}

fn standings_key(callsign: &str) -> String {
    callsign.trim().to_lowercase()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
