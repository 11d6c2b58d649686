use std::collections::BTreeSet;

use contracts::{ActivityRecord, ProgressionSnapshot};

use crate::catalog::{RewardCatalog, RewardDefinition};

/// Evaluate the catalog against a post-award snapshot and return the
/// rewards that just became unlocked, in catalog order.
///
/// Already-granted ids are skipped, so re-running on an unchanged snapshot
/// yields nothing. Ids granted earlier in the same pass are visible to
/// later predicates through the working set; the caller merges the result
/// into `unlocked_reward_ids` and persists.
pub fn evaluate_unlocks<'a>(
    catalog: &'a RewardCatalog,
    snapshot: &ProgressionSnapshot,
    history: &[ActivityRecord],
) -> Vec<&'a RewardDefinition> {
    let mut unlocked = snapshot
        .unlocked_reward_ids
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>();

    let mut newly_unlocked = Vec::new();
    for definition in catalog.iter() {
        if unlocked.contains(definition.reward_id) {
            continue;
        }
        if definition.rule.satisfied(snapshot, history) {
            unlocked.insert(definition.reward_id);
            newly_unlocked.push(definition);
        }
    }

    newly_unlocked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot_with_streak(streak_days: u32) -> ProgressionSnapshot {
        let created = Utc.with_ymd_and_hms(2024, 8, 1, 8, 0, 0).unwrap();
        let mut snapshot = ProgressionSnapshot::initial("user_unlock", created);
        snapshot.streak_days = streak_days;
        snapshot
    }

    #[test]
    fn returns_only_new_unlocks_in_catalog_order() {
        let catalog = RewardCatalog::default();
        let snapshot = snapshot_with_streak(14);

        let unlocked = evaluate_unlocks(&catalog, &snapshot, &[]);
        let ids = unlocked
            .iter()
            .map(|definition| definition.reward_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["weekly_warrior", "gloves_grit"]);
    }

    #[test]
    fn already_unlocked_rewards_are_skipped() {
        let catalog = RewardCatalog::default();
        let mut snapshot = snapshot_with_streak(14);
        snapshot
            .unlocked_reward_ids
            .push("weekly_warrior".to_string());

        let unlocked = evaluate_unlocks(&catalog, &snapshot, &[]);
        let ids = unlocked
            .iter()
            .map(|definition| definition.reward_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["gloves_grit"]);
    }

    #[test]
    fn evaluation_is_idempotent_after_merge() {
        let catalog = RewardCatalog::default();
        let mut snapshot = snapshot_with_streak(30);

        let first_pass = evaluate_unlocks(&catalog, &snapshot, &[]);
        assert!(!first_pass.is_empty());
        for definition in &first_pass {
            snapshot
                .unlocked_reward_ids
                .push(definition.reward_id.to_string());
        }

        let second_pass = evaluate_unlocks(&catalog, &snapshot, &[]);
        assert!(second_pass.is_empty());
    }
}
