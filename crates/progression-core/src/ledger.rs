use contracts::{ProgressionSnapshot, TaskCategory};

use crate::attribute::derive_attribute_gain;
use crate::error::EngineError;
use crate::level::xp_threshold;

/// Apply one XP award to a snapshot, returning the new snapshot.
///
/// Rejects non-positive amounts before touching anything. Leveling rolls
/// over as many times as the award covers; `total_xp` and the per-category
/// totals accumulate the raw amount regardless of rollovers. The input is
/// never mutated, so callers can retry persistence with the same result.
pub fn award_xp(
    snapshot: &ProgressionSnapshot,
    amount: i64,
    category: TaskCategory,
) -> Result<ProgressionSnapshot, EngineError> {
    if amount <= 0 {
        return Err(EngineError::InvalidAward { amount });
    }

    let mut updated = snapshot.clone();
    updated.current_xp = updated.current_xp.saturating_add(amount);

    // Terminates: thresholds are >= 1, so each pass consumes at least one
    // point of the finite award.
    while updated.current_xp >= updated.xp_to_next_level {
        updated.current_xp -= updated.xp_to_next_level;
        updated.level = updated.level.saturating_add(1);
        updated.xp_to_next_level = xp_threshold(updated.level);
    }

    updated.total_xp = updated.total_xp.saturating_add(amount);
    updated.category_xp.add(category, amount);

    let (attribute, gain) = derive_attribute_gain(category, amount);
    if gain > 0 {
        updated.attributes.add(attribute, gain);
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::AttributeKind;

    fn fresh_snapshot() -> ProgressionSnapshot {
        let created = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        ProgressionSnapshot::initial("user_ledger", created)
    }

    #[test]
    fn rejects_non_positive_awards() {
        let snapshot = fresh_snapshot();
        let err = award_xp(&snapshot, 0, TaskCategory::Work).unwrap_err();
        assert_eq!(err, EngineError::InvalidAward { amount: 0 });
        let err = award_xp(&snapshot, -5, TaskCategory::Work).unwrap_err();
        assert_eq!(err, EngineError::InvalidAward { amount: -5 });
    }

    #[test]
    fn award_accumulates_without_level_up() {
        let snapshot = fresh_snapshot();
        let updated = award_xp(&snapshot, 40, TaskCategory::Learning).expect("award");
        assert_eq!(updated.level, 1);
        assert_eq!(updated.current_xp, 40);
        assert_eq!(updated.total_xp, 40);
        assert_eq!(updated.category_xp.learning, 40);
        assert_eq!(updated.attributes.get(AttributeKind::Intelligence), 4);
        // Input untouched.
        assert_eq!(snapshot.current_xp, 0);
    }

    #[test]
    fn single_level_rollover() {
        let snapshot = fresh_snapshot();
        let updated = award_xp(&snapshot, 150, TaskCategory::Health).expect("award");
        assert_eq!(updated.level, 2);
        assert_eq!(updated.current_xp, 50);
        assert_eq!(updated.xp_to_next_level, 150);
        assert_eq!(updated.total_xp, 150);
        assert_eq!(updated.attributes.strength, 15);
    }

    #[test]
    fn large_award_crosses_multiple_levels() {
        let snapshot = fresh_snapshot();
        // 100 + 150 + 225 = 475 clears levels 1-3; 25 spills into level 4.
        let updated = award_xp(&snapshot, 500, TaskCategory::Creativity).expect("award");
        assert_eq!(updated.level, 4);
        assert_eq!(updated.current_xp, 25);
        assert_eq!(updated.xp_to_next_level, xp_threshold(4));
        assert_eq!(updated.total_xp, 500);
    }

    #[test]
    fn invariant_holds_after_every_award() {
        let mut snapshot = fresh_snapshot();
        for amount in [1, 9, 99, 100, 101, 333, 5000] {
            snapshot = award_xp(&snapshot, amount, TaskCategory::Social).expect("award");
            assert!(snapshot.current_xp >= 0);
            assert!(snapshot.current_xp < snapshot.xp_to_next_level);
        }
        assert_eq!(snapshot.total_xp, 1 + 9 + 99 + 100 + 101 + 333 + 5000);
    }
}
