use std::collections::BTreeMap;

use crate::constants::{
    BASE_CAPTURE_MULT, CAPTURE_COOLDOWN_MS, FAIR_RATIO, IMBALANCE_MULT, QUITTER_MEMORY_MS,
    ROSTER_RETENTION_MS, ROSTER_SNAPSHOT_INTERVAL_MS, SELF_CAPTURE_MULT, UNFAIR_CAPTURE_MULT,
    WARN_DEBOUNCE_MS,
};
use crate::types::{
    ArbiterEffect, CaptureKind, CaptureRecord, Faction, GrabVerdict, MatchEvent, MatchSummary,
    PlayerSnapshot, PlayerTally, Role,
};

mod cooldown;
mod fairness;
mod quitters;
mod roster_cache;

pub use cooldown::{CooldownGate, CooldownGateOptions, GateDecision};
pub use fairness::{fair_reward, is_fair, self_capture_penalty, unfair_penalty};
pub use quitters::{QuitterRecord, QuitterTracker, QuitterTrackerOptions};
pub use roster_cache::{RosterCache, RosterCacheOptions};

#[derive(Clone, Copy, Debug)]
pub struct ArbiterOptions {
    pub fair_ratio: f64,
    pub base_capture_mult: i64,
    pub imbalance_mult: i64,
    pub unfair_capture_mult: i64,
    pub self_capture_mult: i64,
    pub capture_cooldown_ms: u64,
    pub roster_retention_ms: u64,
    pub roster_snapshot_interval_ms: u64,
    pub quitter_memory_ms: u64,
    pub warn_debounce_ms: u64,
    pub switch_faction_on_unfair_capture: bool,
}

impl Default for ArbiterOptions {
    fn default() -> Self {
        Self {
            fair_ratio: FAIR_RATIO,
            base_capture_mult: BASE_CAPTURE_MULT,
            imbalance_mult: IMBALANCE_MULT,
            unfair_capture_mult: UNFAIR_CAPTURE_MULT,
            self_capture_mult: SELF_CAPTURE_MULT,
            capture_cooldown_ms: CAPTURE_COOLDOWN_MS,
            roster_retention_ms: ROSTER_RETENTION_MS,
            roster_snapshot_interval_ms: ROSTER_SNAPSHOT_INTERVAL_MS,
            quitter_memory_ms: QUITTER_MEMORY_MS,
            warn_debounce_ms: WARN_DEBOUNCE_MS,
            switch_faction_on_unfair_capture: true,
        }
    }
}

#[derive(Clone, Debug)]
struct RosterMember {
    network_id: String,
    callsign: String,
    role: Role,
}

/// Fairness arbiter for one two-faction match. Owns the live roster, the
/// lagging roster cache, the quitter tracker, the capture cooldown gate and
/// the capture ledger. Every mutation happens synchronously inside one of the
/// event handlers; side effects accumulate in a queue the host drains.
///
/// All timestamps flow in through the events. The arbiter never reads the
/// wall clock, so any sequence of events replays identically.
pub struct MatchArbiter {
    options: ArbiterOptions,
    // BTreeMap keeps roster iteration order stable across runs.
    roster: BTreeMap<String, RosterMember>,
    cache: RosterCache,
    quitters: QuitterTracker,
    gate: CooldownGate,
    ledger: Vec<CaptureRecord>,
    effects: Vec<ArbiterEffect>,
}

impl MatchArbiter {
    pub fn new(options: ArbiterOptions) -> Self {
        Self {
            options,
            roster: BTreeMap::new(),
            cache: RosterCache::new(RosterCacheOptions {
                snapshot_interval_ms: options.roster_snapshot_interval_ms,
                retention_ms: options.roster_retention_ms,
            }),
            quitters: QuitterTracker::new(QuitterTrackerOptions {
                memory_ms: options.quitter_memory_ms,
            }),
            gate: CooldownGate::new(CooldownGateOptions {
                cooldown_ms: options.capture_cooldown_ms,
                warn_debounce_ms: options.warn_debounce_ms,
            }),
            ledger: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Dispatches one event. The return value is a verdict only for grab
    /// attempts; every other event answers through effects alone.
    pub fn apply(&mut self, event: MatchEvent) -> Option<GrabVerdict> {
        match event {
            MatchEvent::Tick { now_ms } => {
                self.on_tick(now_ms);
                None
            }
            MatchEvent::Capture {
                now_ms,
                capturing,
                captured,
                capturing_player,
            } => {
                self.on_capture(now_ms, capturing, captured, &capturing_player);
                None
            }
            MatchEvent::GrabAttempt {
                now_ms,
                objective,
                grabber,
                grabber_player,
            } => Some(self.on_grab_attempt(now_ms, objective, grabber, &grabber_player)),
            MatchEvent::Join {
                now_ms,
                player_id,
                network_id,
                callsign,
                role,
            } => {
                self.on_player_join(now_ms, &player_id, &network_id, &callsign, role);
                None
            }
            MatchEvent::Part { now_ms, player_id } => {
                self.on_player_part(now_ms, &player_id);
                None
            }
        }
    }

    pub fn on_tick(&mut self, now_ms: u64) {
        self.gate.on_tick(now_ms);
        let roster = self.participants();
        self.cache.maybe_refresh(now_ms, roster);
        self.cache.evict_expired(now_ms);
    }

    pub fn on_capture(
        &mut self,
        now_ms: u64,
        capturing: Faction,
        captured: Faction,
        capturing_player: &str,
    ) {
        let callsign = self.callsign_of(capturing_player);
        let reference = self.cache.reference().cloned();

        if capturing == captured {
            match reference {
                Some(reference) => {
                    let size = reference.count_in_faction(capturing);
                    let penalty = self_capture_penalty(size, self.options.self_capture_mult);
                    self.effects.push(ArbiterEffect::Broadcast {
                        message: format!(
                            "{callsign} captured their own faction's objective. -{penalty} point penalty."
                        ),
                    });
                    self.effects.push(ArbiterEffect::AwardLosses {
                        player_id: capturing_player.to_string(),
                        points: penalty,
                    });
                    self.ledger.push(CaptureRecord {
                        at_ms: now_ms,
                        player_id: capturing_player.to_string(),
                        callsign,
                        capturing,
                        captured,
                        kind: CaptureKind::SelfCapture,
                        points: penalty,
                        reference_capturing: size,
                        reference_captured: size,
                    });
                }
                None => self.resolve_unscored(now_ms, capturing, captured, capturing_player),
            }
            return;
        }

        self.gate.arm(captured, now_ms);

        let Some(reference) = reference else {
            self.resolve_unscored(now_ms, capturing, captured, capturing_player);
            return;
        };

        let ref_capturing = reference.count_in_faction(capturing);
        let ref_captured = reference.count_in_faction(captured);
        let cached_fair = is_fair(ref_capturing, ref_captured, self.options.fair_ratio);
        let live_fair = is_fair(
            self.live_count(capturing),
            self.live_count(captured),
            self.options.fair_ratio,
        );

        if cached_fair {
            let reward = fair_reward(
                ref_capturing,
                ref_captured,
                self.options.base_capture_mult,
                self.options.imbalance_mult,
            );
            if !live_fair {
                // Fairness degraded between the snapshot and the capture:
                // call out the walkouts, then pay out from the snapshot
                // anyway so the capture cannot be stiffed.
                self.disclose_walkouts(now_ms, captured, &reference, ref_capturing, ref_captured);
                self.effects.push(ArbiterEffect::Broadcast {
                    message: format!("{callsign} still collects {reward} points for the capture."),
                });
            } else {
                self.effects.push(ArbiterEffect::Broadcast {
                    message: format!(
                        "Score! {callsign} captured the {} objective for a +{reward} bonus.",
                        captured.label()
                    ),
                });
            }
            self.effects.push(ArbiterEffect::AwardWins {
                player_id: capturing_player.to_string(),
                points: reward,
            });
            self.ledger.push(CaptureRecord {
                at_ms: now_ms,
                player_id: capturing_player.to_string(),
                callsign,
                capturing,
                captured,
                kind: CaptureKind::Fair,
                points: reward,
                reference_capturing: ref_capturing,
                reference_captured: ref_captured,
            });
            return;
        }

        if ref_captured == 0 {
            self.effects.push(ArbiterEffect::Broadcast {
                message: format!(
                    "Odd one: {callsign} captured the {} objective, but {} had no players on record.",
                    captured.label(),
                    captured.label()
                ),
            });
        }
        let penalty = unfair_penalty(ref_capturing, ref_captured, self.options.unfair_capture_mult);
        self.effects.push(ArbiterEffect::Broadcast {
            message: format!(
                "Come on, {callsign} captured unfairly and takes a {penalty} point penalty."
            ),
        });
        self.effects.push(ArbiterEffect::AwardLosses {
            player_id: capturing_player.to_string(),
            points: penalty,
        });
        if self.options.switch_faction_on_unfair_capture {
            self.effects.push(ArbiterEffect::SwitchFaction {
                player_id: capturing_player.to_string(),
                faction: captured,
            });
            self.effects.push(ArbiterEffect::Broadcast {
                message: format!(
                    "{callsign} has been moved to the {} faction to even things out.",
                    captured.label()
                ),
            });
            self.effects.push(ArbiterEffect::Whisper {
                player_id: capturing_player.to_string(),
                message: format!("You have been moved to the {} faction.", captured.label()),
            });
            // Mirror the reassignment the host is about to perform.
            if let Some(member) = self.roster.get_mut(capturing_player) {
                member.role = Role::Playing(captured);
            }
        }
        self.ledger.push(CaptureRecord {
            at_ms: now_ms,
            player_id: capturing_player.to_string(),
            callsign,
            capturing,
            captured,
            kind: CaptureKind::Unfair,
            points: penalty,
            reference_capturing: ref_capturing,
            reference_captured: ref_captured,
        });
    }

    pub fn on_grab_attempt(
        &mut self,
        now_ms: u64,
        objective: Faction,
        grabber: Faction,
        grabber_player: &str,
    ) -> GrabVerdict {
        match self.gate.evaluate(now_ms, objective, grabber, grabber_player) {
            GateDecision::Deny { warn_remaining_s } => {
                if let Some(seconds) = warn_remaining_s {
                    self.effects.push(ArbiterEffect::Whisper {
                        player_id: grabber_player.to_string(),
                        message: format!(
                            "Wait another {seconds}s before grabbing the {} objective. No spawn-capturing.",
                            objective.label()
                        ),
                    });
                }
                return GrabVerdict::Denied;
            }
            GateDecision::Allow | GateDecision::AllowAndClear => {}
        }

        // Heads-up to a player picking up the enemy objective while the live
        // counts would make the capture unfair.
        if objective == grabber.opposite() {
            let ours = self.live_count(grabber);
            let theirs = self.live_count(objective);
            if !is_fair(ours, theirs, self.options.fair_ratio) {
                self.effects.push(ArbiterEffect::Whisper {
                    player_id: grabber_player.to_string(),
                    message: format!("{ours} v {theirs}? Keep it fair."),
                });
            }
        }
        GrabVerdict::Allowed
    }

    pub fn on_player_join(
        &mut self,
        now_ms: u64,
        player_id: &str,
        network_id: &str,
        callsign: &str,
        role: Role,
    ) {
        if let Some(previous) = self.quitters.lookup(now_ms, network_id) {
            if previous == callsign {
                self.effects.push(ArbiterEffect::Broadcast {
                    message: format!(
                        "{callsign} walked out right before a capture and is already back. Bold."
                    ),
                });
            } else {
                self.effects.push(ArbiterEffect::Broadcast {
                    message: format!(
                        "{previous} walked out right before a capture and is back hiding under the alias '{callsign}'."
                    ),
                });
                self.effects.push(ArbiterEffect::Whisper {
                    player_id: player_id.to_string(),
                    message: "The capture was scored from the roster before you left. Your walkout changed nothing.".to_string(),
                });
            }
            self.quitters.consume(network_id);
        }

        // A rejoin with a live player id overwrites the stale entry.
        self.roster.insert(
            player_id.to_string(),
            RosterMember {
                network_id: network_id.to_string(),
                callsign: callsign.to_string(),
                role,
            },
        );
    }

    pub fn on_player_part(&mut self, _now_ms: u64, player_id: &str) {
        // Unknown ids are ignored: absence of history is not an error.
        self.roster.remove(player_id);
    }

    pub fn drain_effects(&mut self) -> Vec<ArbiterEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn summary(&self) -> MatchSummary {
        let mut by_player: BTreeMap<String, PlayerTally> = BTreeMap::new();
        for record in &self.ledger {
            let tally = by_player
                .entry(record.player_id.clone())
                .or_insert_with(|| PlayerTally {
                    player_id: record.player_id.clone(),
                    callsign: record.callsign.clone(),
                    captures: 0,
                    points_won: 0,
                    points_lost: 0,
                    net: 0,
                });
            tally.callsign = record.callsign.clone();
            tally.captures += 1;
            match record.kind {
                CaptureKind::Fair => tally.points_won += record.points,
                CaptureKind::Unfair | CaptureKind::SelfCapture => {
                    tally.points_lost += record.points
                }
                CaptureKind::Unscored => {}
            }
            tally.net = tally.points_won as i64 - tally.points_lost as i64;
        }

        let mut tally: Vec<PlayerTally> = by_player.into_values().collect();
        tally.sort_by(|a, b| {
            b.net
                .cmp(&a.net)
                .then_with(|| b.captures.cmp(&a.captures))
                .then_with(|| a.callsign.to_lowercase().cmp(&b.callsign.to_lowercase()))
        });
        MatchSummary {
            captures: self.ledger.clone(),
            tally,
        }
    }

    fn resolve_unscored(
        &mut self,
        now_ms: u64,
        capturing: Faction,
        captured: Faction,
        capturing_player: &str,
    ) {
        // Startup transient: no snapshot has ever been taken, so there is no
        // trustworthy roster to score from. The capture stands, unscored.
        let callsign = self.callsign_of(capturing_player);
        self.effects.push(ArbiterEffect::Broadcast {
            message: format!(
                "{callsign} captured the {} objective. No roster history yet, so no bonus this time.",
                captured.label()
            ),
        });
        self.ledger.push(CaptureRecord {
            at_ms: now_ms,
            player_id: capturing_player.to_string(),
            callsign,
            capturing,
            captured,
            kind: CaptureKind::Unscored,
            points: 0,
            reference_capturing: 0,
            reference_captured: 0,
        });
    }

    fn disclose_walkouts(
        &mut self,
        now_ms: u64,
        captured: Faction,
        reference: &crate::types::RosterSnapshot,
        ref_capturing: usize,
        ref_captured: usize,
    ) {
        let mut walkouts: Vec<String> = Vec::new();
        for snapshot in &reference.players {
            if snapshot.faction != captured {
                continue;
            }
            if self.is_live_participant(&snapshot.network_id) {
                continue;
            }
            self.quitters
                .record(now_ms, &snapshot.network_id, &snapshot.callsign);
            walkouts.push(snapshot.callsign.clone());
        }

        let message = if walkouts.is_empty() {
            format!("It was {ref_capturing} v {ref_captured} moments ago.")
        } else {
            format!(
                "It was {ref_capturing} v {ref_captured} moments ago. {} walked out right before the capture.",
                join_callsigns(&walkouts)
            )
        };
        self.effects.push(ArbiterEffect::Broadcast { message });
    }

    fn participants(&self) -> Vec<PlayerSnapshot> {
        self.roster
            .values()
            .filter_map(|member| {
                member.role.faction().map(|faction| PlayerSnapshot {
                    faction,
                    callsign: member.callsign.clone(),
                    network_id: member.network_id.clone(),
                })
            })
            .collect()
    }

    fn live_count(&self, faction: Faction) -> usize {
        self.roster
            .values()
            .filter(|member| member.role.faction() == Some(faction))
            .count()
    }

    fn is_live_participant(&self, network_id: &str) -> bool {
        self.roster
            .values()
            .any(|member| member.network_id == network_id && member.role.is_playing())
    }

    fn callsign_of(&self, player_id: &str) -> String {
        self.roster
            .get(player_id)
            .map(|member| member.callsign.clone())
            .unwrap_or_else(|| player_id.to_string())
    }
}

fn join_callsigns(callsigns: &[String]) -> String {
    match callsigns {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{} and {last}", rest.join(", ")),
    }
}
