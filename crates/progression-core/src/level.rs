use contracts::BASE_XP_THRESHOLD;

const LEVEL_GROWTH: f64 = 1.5;

/// XP required to advance past `level`: `floor(100 * 1.5^(level - 1))`.
///
/// The threshold is always recomputed from the base rather than by scaling
/// the previous threshold, so a snapshot restored mid-run lands on the same
/// curve. Result is clamped to at least 1, which is what keeps the ledger's
/// rollover loop bounded.
pub fn xp_threshold(level: u32) -> i64 {
    let exponent = level.saturating_sub(1).min(i32::MAX as u32) as i32;
    let threshold = (BASE_XP_THRESHOLD as f64) * LEVEL_GROWTH.powi(exponent);
    (threshold.floor() as i64).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_curve_at_low_levels() {
        assert_eq!(xp_threshold(1), 100);
        assert_eq!(xp_threshold(2), 150);
        assert_eq!(xp_threshold(3), 225);
        assert_eq!(xp_threshold(4), 337);
        assert_eq!(xp_threshold(5), 506);
    }

    #[test]
    fn thresholds_are_positive_and_non_decreasing() {
        let mut previous = 0;
        for level in 1..=80 {
            let threshold = xp_threshold(level);
            assert!(threshold > 0, "level {level} threshold must be positive");
            assert!(
                threshold >= previous,
                "level {level} threshold regressed: {threshold} < {previous}"
            );
            previous = threshold;
        }
    }
}
