use std::collections::HashMap;

use crate::constants::{CAPTURE_COOLDOWN_MS, WARN_DEBOUNCE_MS};
use crate::types::Faction;

#[derive(Clone, Copy, Debug)]
pub struct CooldownGateOptions {
    pub cooldown_ms: u64,
    pub warn_debounce_ms: u64,
}

impl Default for CooldownGateOptions {
    fn default() -> Self {
        Self {
            cooldown_ms: CAPTURE_COOLDOWN_MS,
            warn_debounce_ms: WARN_DEBOUNCE_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// The just-captured faction touched an objective; the lock ends early.
    AllowAndClear,
    /// Spawn-capture attempt. `warn_remaining_s` carries the wait still left,
    /// present only when the per-player debounce lets a warning through.
    Deny { warn_remaining_s: Option<u64> },
}

impl GateDecision {
    pub fn is_allowed(self) -> bool {
        !matches!(self, Self::Deny { .. })
    }
}

#[derive(Clone, Copy, Debug)]
struct ArmedCooldown {
    captured: Faction,
    at_ms: u64,
}

/// After a capture, locks the captured faction's objective against an
/// immediate re-grab by the winners. The captured faction itself may always
/// reclaim, which clears the lock early. Warnings to a repeatedly-denied
/// player are debounced through a per-player last-warn map.
pub struct CooldownGate {
    options: CooldownGateOptions,
    armed: Option<ArmedCooldown>,
    last_warn_by_player: HashMap<String, u64>,
}

impl CooldownGate {
    pub fn new(options: CooldownGateOptions) -> Self {
        Self {
            options,
            armed: None,
            last_warn_by_player: HashMap::new(),
        }
    }

    pub fn arm(&mut self, captured: Faction, now_ms: u64) {
        self.armed = Some(ArmedCooldown {
            captured,
            at_ms: now_ms,
        });
    }

    pub fn evaluate(
        &mut self,
        now_ms: u64,
        objective: Faction,
        grabber: Faction,
        grabber_player: &str,
    ) -> GateDecision {
        let Some(armed) = self.armed else {
            return GateDecision::Allow;
        };
        if now_ms.saturating_sub(armed.at_ms) >= self.options.cooldown_ms {
            return GateDecision::Allow;
        }

        // The faction that just lost its objective ends the lock by touching
        // either objective.
        if grabber == armed.captured {
            self.armed = None;
            self.last_warn_by_player.clear();
            return GateDecision::AllowAndClear;
        }
        if objective == armed.captured {
            let warn_remaining_s = self.maybe_warn(now_ms, armed, grabber_player);
            return GateDecision::Deny { warn_remaining_s };
        }
        GateDecision::Allow
    }

    fn maybe_warn(&mut self, now_ms: u64, armed: ArmedCooldown, grabber_player: &str) -> Option<u64> {
        if let Some(last) = self.last_warn_by_player.get(grabber_player) {
            if now_ms.saturating_sub(*last) < self.options.warn_debounce_ms {
                return None;
            }
        }
        self.last_warn_by_player
            .insert(grabber_player.to_string(), now_ms);
        let end_ms = armed.at_ms + self.options.cooldown_ms;
        Some(end_ms.saturating_sub(now_ms).div_ceil(1_000))
    }

    /// Once the cooldown has naturally run out there is nothing left to warn
    /// about; drop the bookkeeping.
    pub fn on_tick(&mut self, now_ms: u64) {
        let Some(armed) = self.armed else {
            return;
        };
        if now_ms.saturating_sub(armed.at_ms) >= self.options.cooldown_ms {
            self.armed = None;
            self.last_warn_by_player.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(cooldown_ms: u64, warn_debounce_ms: u64) -> CooldownGate {
        CooldownGate::new(CooldownGateOptions {
            cooldown_ms,
            warn_debounce_ms,
        })
    }

    #[test]
    fn unarmed_gate_allows_everything() {
        let mut gate = gate(30_000, 5_000);
        assert_eq!(
            gate.evaluate(0, Faction::Blue, Faction::Red, "p1"),
            GateDecision::Allow
        );
    }

    #[test]
    fn winner_is_denied_until_cooldown_elapses() {
        let mut gate = gate(30_000, 5_000);
        // Red captured Blue's objective.
        gate.arm(Faction::Blue, 0);

        assert!(!gate.evaluate(1_000, Faction::Blue, Faction::Red, "p1").is_allowed());
        assert_eq!(
            gate.evaluate(30_000, Faction::Blue, Faction::Red, "p1"),
            GateDecision::Allow
        );
    }

    #[test]
    fn captured_faction_reclaim_allows_and_clears() {
        let mut gate = gate(30_000, 5_000);
        gate.arm(Faction::Blue, 0);

        assert_eq!(
            gate.evaluate(1_000, Faction::Blue, Faction::Blue, "b1"),
            GateDecision::AllowAndClear
        );
        // Lock is gone: the winners may grab immediately afterwards.
        assert_eq!(
            gate.evaluate(1_001, Faction::Blue, Faction::Red, "r1"),
            GateDecision::Allow
        );
    }

    #[test]
    fn captured_faction_grabbing_enemy_objective_also_clears() {
        let mut gate = gate(30_000, 5_000);
        gate.arm(Faction::Blue, 0);

        assert_eq!(
            gate.evaluate(1_000, Faction::Red, Faction::Blue, "b1"),
            GateDecision::AllowAndClear
        );
    }

    #[test]
    fn grab_unrelated_to_the_lock_is_allowed() {
        let mut gate = gate(30_000, 5_000);
        gate.arm(Faction::Blue, 0);

        // Red touching its own objective is not a spawn-capture.
        assert_eq!(
            gate.evaluate(1_000, Faction::Red, Faction::Red, "r1"),
            GateDecision::Allow
        );
    }

    #[test]
    fn warnings_are_debounced_per_player() {
        let mut gate = gate(30_000, 5_000);
        gate.arm(Faction::Blue, 0);

        assert_eq!(
            gate.evaluate(1_000, Faction::Blue, Faction::Red, "r1"),
            GateDecision::Deny {
                warn_remaining_s: Some(29)
            }
        );
        assert_eq!(
            gate.evaluate(2_000, Faction::Blue, Faction::Red, "r1"),
            GateDecision::Deny {
                warn_remaining_s: None
            }
        );
        // A different player gets their own warning.
        assert_eq!(
            gate.evaluate(2_000, Faction::Blue, Faction::Red, "r2"),
            GateDecision::Deny {
                warn_remaining_s: Some(28)
            }
        );
        // Debounce window elapsed for the first player.
        assert_eq!(
            gate.evaluate(6_000, Faction::Blue, Faction::Red, "r1"),
            GateDecision::Deny {
                warn_remaining_s: Some(24)
            }
        );
    }

    #[test]
    fn tick_clears_warn_map_after_natural_expiry() {
        let mut gate = gate(30_000, 60_000);
        gate.arm(Faction::Blue, 0);
        assert_eq!(
            gate.evaluate(1_000, Faction::Blue, Faction::Red, "r1"),
            GateDecision::Deny {
                warn_remaining_s: Some(29)
            }
        );

        gate.on_tick(31_000);
        gate.arm(Faction::Blue, 31_000);

        // Without the tick-driven clear the huge debounce would swallow this.
        assert_eq!(
            gate.evaluate(32_000, Faction::Blue, Faction::Red, "r1"),
            GateDecision::Deny {
                warn_remaining_s: Some(29)
            }
        );
    }
}
