use serde_json::Value;

use crate::types::Faction;

/// Messages the game host sends over the event stream. Every in-match message
/// carries its own `nowMs` timestamp; the arbiter never consults a clock.
#[derive(Debug)]
pub enum ParsedHostMessage {
    MatchStart,
    Tick {
        now_ms: u64,
    },
    Capture {
        now_ms: u64,
        capturing: Faction,
        captured: Faction,
        player_id: String,
    },
    Grab {
        now_ms: u64,
        objective: Faction,
        grabber: Faction,
        player_id: String,
    },
    Join {
        now_ms: u64,
        player_id: String,
        network_id: String,
        callsign: String,
        faction: Option<Faction>,
    },
    Part {
        now_ms: u64,
        player_id: String,
    },
    MatchEnd,
    Ping {
        t: f64,
    },
}

pub fn parse_host_message(raw: &str) -> Option<ParsedHostMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "match_start" => Some(ParsedHostMessage::MatchStart),
        "tick" => {
            let now_ms = parse_now_ms(object.get("nowMs"))?;
            Some(ParsedHostMessage::Tick { now_ms })
        }
        "capture" => {
            let now_ms = parse_now_ms(object.get("nowMs"))?;
            let capturing = Faction::parse(object.get("capturing")?.as_str()?)?;
            let captured = Faction::parse(object.get("captured")?.as_str()?)?;
            let player_id = object.get("playerId")?.as_str()?.to_string();
            Some(ParsedHostMessage::Capture {
                now_ms,
                capturing,
                captured,
                player_id,
            })
        }
        "grab" => {
            let now_ms = parse_now_ms(object.get("nowMs"))?;
            let objective = Faction::parse(object.get("objective")?.as_str()?)?;
            let grabber = Faction::parse(object.get("grabber")?.as_str()?)?;
            let player_id = object.get("playerId")?.as_str()?.to_string();
            Some(ParsedHostMessage::Grab {
                now_ms,
                objective,
                grabber,
                player_id,
            })
        }
        "join" => {
            let now_ms = parse_now_ms(object.get("nowMs"))?;
            let player_id = object.get("playerId")?.as_str()?.to_string();
            let network_id = object.get("networkId")?.as_str()?.to_string();
            let callsign = object.get("callsign")?.as_str()?.to_string();
            // Absent or null faction means the player joined as an observer.
            let faction = match object.get("faction") {
                None => None,
                Some(Value::Null) => None,
                Some(value) => Some(Faction::parse(value.as_str()?)?),
            };
            Some(ParsedHostMessage::Join {
                now_ms,
                player_id,
                network_id,
                callsign,
                faction,
            })
        }
        "part" => {
            let now_ms = parse_now_ms(object.get("nowMs"))?;
            let player_id = object.get("playerId")?.as_str()?.to_string();
            Some(ParsedHostMessage::Part { now_ms, player_id })
        }
        "match_end" => Some(ParsedHostMessage::MatchEnd),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedHostMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_now_ms(value: Option<&Value>) -> Option<u64> {
    let value = value?;
    if let Some(number) = value.as_u64() {
        return Some(number);
    }
    // Hosts driving the clock from a float timer send e.g. 1234.0.
    if let Some(number) = value.as_f64() {
        if number.is_finite() && number >= 0.0 && number <= u64::MAX as f64 {
            return Some(number.floor() as u64);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tick_message() {
        let parsed =
            parse_host_message(r#"{"type":"tick","nowMs":4000}"#).expect("tick should parse");
        assert!(matches!(parsed, ParsedHostMessage::Tick { now_ms: 4_000 }));
    }

    #[test]
    fn parse_tick_floors_float_timestamps() {
        let parsed =
            parse_host_message(r#"{"type":"tick","nowMs":4000.9}"#).expect("tick should parse");
        assert!(matches!(parsed, ParsedHostMessage::Tick { now_ms: 4_000 }));
    }

    #[test]
    fn parse_tick_rejects_negative_and_missing_timestamps() {
        assert!(parse_host_message(r#"{"type":"tick","nowMs":-5}"#).is_none());
        assert!(parse_host_message(r#"{"type":"tick"}"#).is_none());
    }

    #[test]
    fn parse_capture_message() {
        let parsed = parse_host_message(
            r#"{"type":"capture","nowMs":1000,"capturing":"red","captured":"blue","playerId":"p7"}"#,
        )
        .expect("capture should parse");
        match parsed {
            ParsedHostMessage::Capture {
                now_ms,
                capturing,
                captured,
                player_id,
            } => {
                assert_eq!(now_ms, 1_000);
                assert_eq!(capturing, Faction::Red);
                assert_eq!(captured, Faction::Blue);
                assert_eq!(player_id, "p7");
            }
            _ => panic!("expected capture message"),
        }
    }

    #[test]
    fn parse_capture_rejects_unknown_faction() {
        let parsed = parse_host_message(
            r#"{"type":"capture","nowMs":1000,"capturing":"green","captured":"blue","playerId":"p7"}"#,
        );
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_grab_message() {
        let parsed = parse_host_message(
            r#"{"type":"grab","nowMs":2000,"objective":"blue","grabber":"red","playerId":"p1"}"#,
        )
        .expect("grab should parse");
        assert!(matches!(
            parsed,
            ParsedHostMessage::Grab {
                objective: Faction::Blue,
                grabber: Faction::Red,
                ..
            }
        ));
    }

    #[test]
    fn parse_join_message_with_faction() {
        let parsed = parse_host_message(
            r#"{"type":"join","nowMs":0,"playerId":"p1","networkId":"10.0.0.1","callsign":"Ada","faction":"red"}"#,
        )
        .expect("join should parse");
        match parsed {
            ParsedHostMessage::Join {
                callsign, faction, ..
            } => {
                assert_eq!(callsign, "Ada");
                assert_eq!(faction, Some(Faction::Red));
            }
            _ => panic!("expected join message"),
        }
    }

    #[test]
    fn parse_join_without_faction_is_an_observer() {
        let parsed = parse_host_message(
            r#"{"type":"join","nowMs":0,"playerId":"p1","networkId":"10.0.0.1","callsign":"Ada"}"#,
        )
        .expect("join should parse");
        assert!(matches!(
            parsed,
            ParsedHostMessage::Join { faction: None, .. }
        ));

        let parsed = parse_host_message(
            r#"{"type":"join","nowMs":0,"playerId":"p1","networkId":"10.0.0.1","callsign":"Ada","faction":null}"#,
        )
        .expect("join should parse");
        assert!(matches!(
            parsed,
            ParsedHostMessage::Join { faction: None, .. }
        ));
    }

    #[test]
    fn parse_join_rejects_invalid_faction() {
        let parsed = parse_host_message(
            r#"{"type":"join","nowMs":0,"playerId":"p1","networkId":"10.0.0.1","callsign":"Ada","faction":"gold"}"#,
        );
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_part_message() {
        let parsed = parse_host_message(r#"{"type":"part","nowMs":500,"playerId":"p1"}"#)
            .expect("part should parse");
        assert!(matches!(parsed, ParsedHostMessage::Part { .. }));
    }

    #[test]
    fn parse_match_lifecycle_messages() {
        assert!(matches!(
            parse_host_message(r#"{"type":"match_start"}"#),
            Some(ParsedHostMessage::MatchStart)
        ));
        assert!(matches!(
            parse_host_message(r#"{"type":"match_end"}"#),
            Some(ParsedHostMessage::MatchEnd)
        ));
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        assert!(matches!(
            parse_host_message(r#"{"type":"ping","t":12.5}"#),
            Some(ParsedHostMessage::Ping { .. })
        ));
        assert!(parse_host_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn parse_rejects_unknown_type_and_garbage() {
        assert!(parse_host_message(r#"{"type":"dance"}"#).is_none());
        assert!(parse_host_message("not json").is_none());
        assert!(parse_host_message("[]").is_none());
    }
}
