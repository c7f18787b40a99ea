// Default tuning values for the fairness arbiter. Every knob can be
// overridden through ArbiterOptions.

pub const FAIR_RATIO: f64 = 1.34;
// Guards float flicker right at the configured ratio boundary.
pub const FAIR_RATIO_EPSILON: f64 = 0.001;

pub const BASE_CAPTURE_MULT: i64 = 3;
pub const IMBALANCE_MULT: i64 = 8;
pub const UNFAIR_CAPTURE_MULT: i64 = 5;
pub const SELF_CAPTURE_MULT: i64 = 5;

pub const CAPTURE_COOLDOWN_MS: u64 = 30_000;
pub const ROSTER_RETENTION_MS: u64 = 10_000;
pub const ROSTER_SNAPSHOT_INTERVAL_MS: u64 = 4_000;
pub const QUITTER_MEMORY_MS: u64 = 60_000;
pub const WARN_DEBOUNCE_MS: u64 = 5_000;
