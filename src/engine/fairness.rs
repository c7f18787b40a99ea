use crate::constants::FAIR_RATIO_EPSILON;

/// A capture of `captured` by `capturing` is fair while the size ratio stays
/// under the configured limit. Capturing an empty faction is never fair.
pub fn is_fair(capturing: usize, captured: usize, fair_ratio: f64) -> bool {
    if captured == 0 {
        return false;
    }
    capturing as f64 / captured as f64 <= fair_ratio + FAIR_RATIO_EPSILON
}

/// Bonus for a fair capture: scales with the captured faction's size, plus an
/// extra for being outnumbered. Clamped so a favorable imbalance can never
/// turn the bonus into a deduction.
pub fn fair_reward(capturing: usize, captured: usize, base_mult: i64, imbalance_mult: i64) -> u32 {
    let capturing = capturing as i64;
    let captured = captured as i64;
    let reward = base_mult * captured + imbalance_mult * (captured - capturing);
    reward.max(0) as u32
}

/// Penalty magnitude for an unfair capture, scaling with how outnumbered the
/// captured faction was. The caller applies it as a loss.
pub fn unfair_penalty(capturing: usize, captured: usize, unfair_mult: i64) -> u32 {
    let penalty = unfair_mult * (capturing as i64 - captured as i64);
    penalty.max(0) as u32
}

/// Penalty magnitude for capturing your own faction's objective.
pub fn self_capture_penalty(capturing: usize, self_mult: i64) -> u32 {
    (self_mult * capturing as i64).max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BASE_CAPTURE_MULT, FAIR_RATIO, IMBALANCE_MULT, UNFAIR_CAPTURE_MULT};

    #[test]
    fn capturing_an_empty_faction_is_unfair() {
        assert!(!is_fair(3, 0, FAIR_RATIO));
        assert!(!is_fair(0, 0, FAIR_RATIO));
    }

    #[test]
    fn ratio_under_the_limit_is_fair() {
        assert!(is_fair(2, 4, FAIR_RATIO));
        assert!(is_fair(4, 3, FAIR_RATIO));
        assert!(!is_fair(4, 1, FAIR_RATIO));
    }

    #[test]
    fn ratio_exactly_at_the_limit_is_fair() {
        // 134 / 100 lands exactly on the ratio; the epsilon keeps the
        // boundary from flickering on float rounding.
        assert!(is_fair(134, 100, FAIR_RATIO));
        assert!(!is_fair(135, 100, FAIR_RATIO));
    }

    #[test]
    fn outnumbered_fair_capture_from_reference_sizes() {
        // 2 v 4 capture: 3*4 + 8*(4-2) = 28.
        assert!(is_fair(2, 4, FAIR_RATIO));
        assert_eq!(fair_reward(2, 4, BASE_CAPTURE_MULT, IMBALANCE_MULT), 28);
    }

    #[test]
    fn unfair_capture_penalty_from_reference_sizes() {
        // 4 v 1 capture: 5*(4-1) = 15.
        assert!(!is_fair(4, 1, FAIR_RATIO));
        assert_eq!(unfair_penalty(4, 1, UNFAIR_CAPTURE_MULT), 15);
    }

    #[test]
    fn fair_reward_never_goes_negative() {
        // With a small base and a heavy imbalance weight the raw formula
        // would dip below zero for a slight advantage; it must clamp.
        assert_eq!(fair_reward(4, 3, 1, 8), 0);
        assert_eq!(fair_reward(3, 3, 1, 8), 3);
    }

    #[test]
    fn unfair_penalty_never_goes_negative() {
        assert_eq!(unfair_penalty(0, 0, UNFAIR_CAPTURE_MULT), 0);
    }

    #[test]
    fn self_capture_penalty_scales_with_faction_size() {
        assert_eq!(self_capture_penalty(4, 5), 20);
        assert_eq!(self_capture_penalty(0, 5), 0);
    }
}
