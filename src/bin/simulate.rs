use capture_arbiter::engine::{ArbiterOptions, MatchArbiter};
use capture_arbiter::types::{ArbiterEffect, Faction, MatchEvent, Role};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Replays a match against the arbiter and prints every effect it emits.
/// The same seed always produces the same transcript.
#[derive(Debug, Parser)]
#[command(name = "simulate")]
struct Args {
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Match length in one-second ticks.
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    #[arg(long, default_value_t = 3)]
    red: usize,

    #[arg(long, default_value_t = 4)]
    blue: usize,

    /// Run the fixed walkout scenario instead of a random match.
    #[arg(long)]
    scripted: bool,
}

struct Sim {
    arbiter: MatchArbiter,
}

impl Sim {
    fn new() -> Self {
        Self {
            arbiter: MatchArbiter::new(ArbiterOptions::default()),
        }
    }

    fn apply(&mut self, event: MatchEvent) {
        let label = event_label(&event);
        let now_ms = event_now_ms(&event);
        let verdict = self.arbiter.apply(event);
        if let Some(verdict) = verdict {
            println!("[{now_ms:>7}ms] {label} -> {}", if verdict.is_allowed() { "allowed" } else { "denied" });
        }
        for effect in self.arbiter.drain_effects() {
            println!("[{now_ms:>7}ms] {}", describe_effect(&effect));
        }
    }

    fn join(&mut self, now_ms: u64, id: &str, network_id: &str, callsign: &str, faction: Faction) {
        self.apply(MatchEvent::Join {
            now_ms,
            player_id: id.to_string(),
            network_id: network_id.to_string(),
            callsign: callsign.to_string(),
            role: Role::Playing(faction),
        });
    }

    fn finish(self) {
        let summary = self.arbiter.summary();
        let text = serde_json::to_string_pretty(&summary).expect("summary serializes");
        println!("{text}");
    }
}

fn main() {
    let args = Args::parse();
    if args.scripted {
        run_scripted();
    } else {
        run_random(&args);
    }
}

/// An outnumbered faction captures, the larger faction bleeds players right
/// before the capture, and one of them sneaks back under a new callsign.
fn run_scripted() {
    let mut sim = Sim::new();
    sim.join(0, "r1", "10.0.0.1", "Ada", Faction::Red);
    sim.join(0, "r2", "10.0.0.2", "Grace", Faction::Red);
    for idx in 0..4u32 {
        sim.join(
            0,
            &format!("b{}", idx + 1),
            &format!("10.0.1.{}", idx + 1),
            &format!("Blue-{}", idx + 1),
            Faction::Blue,
        );
    }
    sim.apply(MatchEvent::Tick { now_ms: 0 });

    for id in ["b2", "b3", "b4"] {
        sim.apply(MatchEvent::Part {
            now_ms: 2_000,
            player_id: id.to_string(),
        });
    }
    sim.apply(MatchEvent::Capture {
        now_ms: 3_000,
        capturing: Faction::Red,
        captured: Faction::Blue,
        capturing_player: "r1".to_string(),
    });

    sim.apply(MatchEvent::GrabAttempt {
        now_ms: 5_000,
        objective: Faction::Blue,
        grabber: Faction::Red,
        grabber_player: "r2".to_string(),
    });

    sim.join(20_000, "b9", "10.0.1.2", "Nobody", Faction::Blue);
    sim.finish();
}

fn run_random(args: &Args) {
    let mut rng = SmallRng::seed_from_u64(args.seed);
    let mut sim = Sim::new();

    let mut live: Vec<(String, String, Faction)> = Vec::new();
    let mut departed: Vec<(String, String, Faction)> = Vec::new();
    let mut next_id = 0u32;

    fn spawn(faction: Faction, next_id: &mut u32) -> (String, String, Faction) {
        *next_id += 1;
        (
            format!("p{next_id}"),
            format!("10.0.0.{next_id}"),
            faction,
        )
    }

    for _ in 0..args.red {
        let player = spawn(Faction::Red, &mut next_id);
        sim.join(0, &player.0, &player.1, &format!("R-{}", player.0), player.2);
        live.push(player);
    }
    for _ in 0..args.blue {
        let player = spawn(Faction::Blue, &mut next_id);
        sim.join(0, &player.0, &player.1, &format!("B-{}", player.0), player.2);
        live.push(player);
    }

    for tick in 0..args.ticks {
        let now_ms = tick * 1_000;
        sim.apply(MatchEvent::Tick { now_ms });

        // Occasional churn: someone walks out, someone comes back.
        if !live.is_empty() && rng.random_bool(0.05) {
            let idx = rng.random_range(0..live.len());
            let player = live.remove(idx);
            sim.apply(MatchEvent::Part {
                now_ms,
                player_id: player.0.clone(),
            });
            departed.push(player);
        }
        if !departed.is_empty() && rng.random_bool(0.04) {
            let idx = rng.random_range(0..departed.len());
            let (_, network_id, faction) = departed.remove(idx);
            let player = spawn(faction, &mut next_id);
            let callsign = if rng.random_bool(0.5) {
                format!("R-{}", player.0)
            } else {
                format!("Ghost-{}", player.0)
            };
            sim.join(now_ms, &player.0, &network_id, &callsign, faction);
            live.push((player.0, network_id, faction));
        }

        // A grab attempt, sometimes followed by a capture a moment later.
        if !live.is_empty() && rng.random_bool(0.15) {
            let (player_id, _, grabber) = live[rng.random_range(0..live.len())].clone();
            let objective = if rng.random_bool(0.9) {
                grabber.opposite()
            } else {
                grabber
            };
            sim.apply(MatchEvent::GrabAttempt {
                now_ms: now_ms + 100,
                objective,
                grabber,
                grabber_player: player_id.clone(),
            });
            if rng.random_bool(0.3) {
                sim.apply(MatchEvent::Capture {
                    now_ms: now_ms + 600,
                    capturing: grabber,
                    captured: objective,
                    capturing_player: player_id,
                });
            }
        }
    }

    sim.finish();
}

fn event_label(event: &MatchEvent) -> String {
    match event {
        MatchEvent::Tick { .. } => "tick".to_string(),
        MatchEvent::Capture {
            capturing,
            captured,
            capturing_player,
            ..
        } => format!(
            "capture {} -> {} by {capturing_player}",
            capturing.label(),
            captured.label()
        ),
        MatchEvent::GrabAttempt {
            objective,
            grabber_player,
            ..
        } => format!("grab {} by {grabber_player}", objective.label()),
        MatchEvent::Join { player_id, .. } => format!("join {player_id}"),
        MatchEvent::Part { player_id, .. } => format!("part {player_id}"),
    }
}

fn event_now_ms(event: &MatchEvent) -> u64 {
    match event {
        MatchEvent::Tick { now_ms }
        | MatchEvent::Capture { now_ms, .. }
        | MatchEvent::GrabAttempt { now_ms, .. }
        | MatchEvent::Join { now_ms, .. }
        | MatchEvent::Part { now_ms, .. } => *now_ms,
    }
}

fn describe_effect(effect: &ArbiterEffect) -> String {
    match effect {
        ArbiterEffect::Broadcast { message } => format!("broadcast: {message}"),
        ArbiterEffect::Whisper { player_id, message } => {
            format!("whisper to {player_id}: {message}")
        }
        ArbiterEffect::AwardWins { player_id, points } => {
            format!("award +{points} wins to {player_id}")
        }
        ArbiterEffect::AwardLosses { player_id, points } => {
            format!("award -{points} losses to {player_id}")
        }
        ArbiterEffect::SwitchFaction { player_id, faction } => {
            format!("switch {player_id} to {}", faction.label())
        }
    }
}
