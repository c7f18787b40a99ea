use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Red,
    Blue,
}

impl Faction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "red" => Some(Self::Red),
            "blue" => Some(Self::Blue),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Playing(Faction),
    Observer,
}

impl Role {
    pub fn faction(self) -> Option<Faction> {
        match self {
            Self::Playing(faction) => Some(faction),
            Self::Observer => None,
        }
    }

    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing(_))
    }
}

/// Roster membership as it looked at snapshot time. Never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub faction: Faction,
    pub callsign: String,
    pub network_id: String,
}

#[derive(Clone, Debug)]
pub struct RosterSnapshot {
    pub at_ms: u64,
    pub players: Vec<PlayerSnapshot>,
}

impl RosterSnapshot {
    pub fn count_in_faction(&self, faction: Faction) -> usize {
        self.players
            .iter()
            .filter(|player| player.faction == faction)
            .count()
    }
}

#[derive(Clone, Debug)]
pub enum MatchEvent {
    Tick {
        now_ms: u64,
    },
    Capture {
        now_ms: u64,
        capturing: Faction,
        captured: Faction,
        capturing_player: String,
    },
    GrabAttempt {
        now_ms: u64,
        objective: Faction,
        grabber: Faction,
        grabber_player: String,
    },
    Join {
        now_ms: u64,
        player_id: String,
        network_id: String,
        callsign: String,
        role: Role,
    },
    Part {
        now_ms: u64,
        player_id: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabVerdict {
    Allowed,
    Denied,
}

impl GrabVerdict {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }
}

/// Side effects the arbiter asks its host to perform. Points are always
/// non-negative; the direction of the score change is encoded by the variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArbiterEffect {
    Broadcast {
        message: String,
    },
    Whisper {
        #[serde(rename = "playerId")]
        player_id: String,
        message: String,
    },
    AwardWins {
        #[serde(rename = "playerId")]
        player_id: String,
        points: u32,
    },
    AwardLosses {
        #[serde(rename = "playerId")]
        player_id: String,
        points: u32,
    },
    SwitchFaction {
        #[serde(rename = "playerId")]
        player_id: String,
        faction: Faction,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Fair,
    Unfair,
    SelfCapture,
    // Capture resolved before any roster snapshot existed; no score change.
    Unscored,
}

#[derive(Clone, Debug, Serialize)]
pub struct CaptureRecord {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub callsign: String,
    pub capturing: Faction,
    pub captured: Faction,
    pub kind: CaptureKind,
    pub points: u32,
    #[serde(rename = "referenceCapturing")]
    pub reference_capturing: usize,
    #[serde(rename = "referenceCaptured")]
    pub reference_captured: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerTally {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub callsign: String,
    pub captures: u32,
    #[serde(rename = "pointsWon")]
    pub points_won: u32,
    #[serde(rename = "pointsLost")]
    pub points_lost: u32,
    pub net: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchSummary {
    pub captures: Vec<CaptureRecord>,
    pub tally: Vec<PlayerTally>,
}

/// One row of the persistent cross-match standings, aggregated by callsign.
#[derive(Clone, Debug, Serialize)]
pub struct StandingEntry {
    pub callsign: String,
    pub matches: u64,
    pub captures: u64,
    #[serde(rename = "pointsWon")]
    pub points_won: u64,
    #[serde(rename = "pointsLost")]
    pub points_lost: u64,
    #[serde(rename = "netTotal")]
    pub net_total: i64,
    #[serde(rename = "bestNet")]
    pub best_net: i64,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct StandingsResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<StandingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faction_parse_accepts_known_labels_only() {
        assert_eq!(Faction::parse("red"), Some(Faction::Red));
        assert_eq!(Faction::parse("blue"), Some(Faction::Blue));
        assert_eq!(Faction::parse("green"), None);
        assert_eq!(Faction::parse("Red"), None);
    }

    #[test]
    fn opposite_is_an_involution() {
        assert_eq!(Faction::Red.opposite(), Faction::Blue);
        assert_eq!(Faction::Blue.opposite().opposite(), Faction::Blue);
    }

    #[test]
    fn snapshot_counts_by_faction() {
        let snapshot = RosterSnapshot {
            at_ms: 0,
            players: vec![
                PlayerSnapshot {
                    faction: Faction::Red,
                    callsign: "A".to_string(),
                    network_id: "1".to_string(),
                },
                PlayerSnapshot {
                    faction: Faction::Blue,
                    callsign: "B".to_string(),
                    network_id: "2".to_string(),
                },
                PlayerSnapshot {
                    faction: Faction::Red,
                    callsign: "C".to_string(),
                    network_id: "3".to_string(),
                },
            ],
        };
        assert_eq!(snapshot.count_in_faction(Faction::Red), 2);
        assert_eq!(snapshot.count_in_faction(Faction::Blue), 1);
    }

    #[test]
    fn effect_serializes_with_tag_and_camel_case_fields() {
        let effect = ArbiterEffect::AwardWins {
            player_id: "p1".to_string(),
            points: 28,
        };
        let json = serde_json::to_value(&effect).expect("serialize effect");
        assert_eq!(json["type"], "award_wins");
        assert_eq!(json["playerId"], "p1");
        assert_eq!(json["points"], 28);
    }
}
