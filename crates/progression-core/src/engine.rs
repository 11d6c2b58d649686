use chrono::NaiveDate;
use contracts::{
    ActivityRecord, CompletionEvent, CompletionKind, CompletionOutcome, Notification,
    ProgressionSnapshot, RewardKind, UnlockedReward, SCHEMA_VERSION_V1,
};

use crate::catalog::RewardCatalog;
use crate::error::EngineError;
use crate::ledger::award_xp;
use crate::streak::update_streak;
use crate::unlock::evaluate_unlocks;

/// Completion orchestrator: one linear pipeline per event, no internal
/// state beyond the catalog. A failed validation aborts before anything is
/// touched, including the caller's history log.
#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
    catalog: RewardCatalog,
}

impl ProgressionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: RewardCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Apply one task or quest-step completion.
    ///
    /// Fixed order: validate, award XP, advance the streak to the event's
    /// calendar day, bump lifetime counters, append to the history log,
    /// evaluate unlocks against the post-award state, merge new reward ids
    /// in unlock order. Unlock predicates therefore see the level, streak,
    /// and history that already include this event.
    pub fn complete_step(
        &self,
        snapshot: &ProgressionSnapshot,
        history: &mut Vec<ActivityRecord>,
        event: &CompletionEvent,
    ) -> Result<CompletionOutcome, EngineError> {
        if event.xp_amount <= 0 {
            return Err(EngineError::InvalidAward {
                amount: event.xp_amount,
            });
        }

        let level_before = snapshot.level;
        let mut updated = award_xp(snapshot, event.xp_amount, event.category)?;
        updated = update_streak(&updated, event.occurred_at.date_naive());

        match event.kind {
            CompletionKind::Task => {
                updated.tasks_completed = updated.tasks_completed.saturating_add(1);
            }
            CompletionKind::QuestStep => {
                if event.quest_completed {
                    updated.quests_completed = updated.quests_completed.saturating_add(1);
                }
            }
        }

        history.push(ActivityRecord::from_event(event));

        let definitions = evaluate_unlocks(&self.catalog, &updated, history);
        let newly_unlocked = definitions
            .iter()
            .map(|definition| definition.to_unlocked())
            .collect::<Vec<_>>();
        for definition in &definitions {
            updated
                .unlocked_reward_ids
                .push(definition.reward_id.to_string());
        }

        let levels_gained = updated.level.saturating_sub(level_before);
        let notifications = build_notifications(&updated, levels_gained, &newly_unlocked);

        Ok(CompletionOutcome {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            user_id: updated.user_id.clone(),
            snapshot: updated,
            newly_unlocked,
            notifications,
            levels_gained,
        })
    }

    /// Login / day-rollover orchestration point: advances the streak
    /// without a completion. Same-day calls are no-ops.
    pub fn roll_day(&self, snapshot: &ProgressionSnapshot, today: NaiveDate) -> ProgressionSnapshot {
        update_streak(snapshot, today)
    }
}

fn build_notifications(
    snapshot: &ProgressionSnapshot,
    levels_gained: u32,
    newly_unlocked: &[UnlockedReward],
) -> Vec<Notification> {
    let mut notifications = Vec::new();

    if levels_gained > 0 {
        notifications.push(Notification::success(format!(
            "Level up! You reached level {}",
            snapshot.level
        )));
    }

    for reward in newly_unlocked {
        let message = match reward.kind {
            RewardKind::Achievement => format!("Achievement Unlocked: {}!", reward.name),
            RewardKind::Badge => format!("New Badge: {}!", reward.name),
            RewardKind::Equipment => format!("New Equipment: {}!", reward.name),
        };
        notifications.push(Notification::success(message));
    }

    notifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use contracts::TaskCategory;

    fn setup() -> (ProgressionEngine, ProgressionSnapshot, Vec<ActivityRecord>) {
        let created = Utc.with_ymd_and_hms(2024, 9, 1, 7, 0, 0).unwrap();
        (
            ProgressionEngine::new(),
            ProgressionSnapshot::initial("user_engine", created),
            Vec::new(),
        )
    }

    #[test]
    fn first_task_unlocks_first_steps_once() {
        let (engine, snapshot, mut history) = setup();
        let event = CompletionEvent::task(
            "evt_1",
            "user_engine",
            TaskCategory::Work,
            20,
            Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap(),
        );

        let outcome = engine
            .complete_step(&snapshot, &mut history, &event)
            .expect("completion");
        assert_eq!(outcome.snapshot.tasks_completed, 1);
        assert!(outcome
            .newly_unlocked
            .iter()
            .any(|reward| reward.reward_id == "first_blood"));

        let second = CompletionEvent::task(
            "evt_2",
            "user_engine",
            TaskCategory::Work,
            20,
            Utc.with_ymd_and_hms(2024, 9, 1, 11, 0, 0).unwrap(),
        );
        let outcome = engine
            .complete_step(&outcome.snapshot, &mut history, &second)
            .expect("completion");
        assert!(!outcome
            .newly_unlocked
            .iter()
            .any(|reward| reward.reward_id == "first_blood"));
    }

    #[test]
    fn invalid_award_leaves_history_untouched() {
        let (engine, snapshot, mut history) = setup();
        let event = CompletionEvent::task(
            "evt_bad",
            "user_engine",
            TaskCategory::Health,
            -5,
            Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap(),
        );

        let err = engine
            .complete_step(&snapshot, &mut history, &event)
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidAward { amount: -5 });
        assert!(history.is_empty());
    }

    #[test]
    fn level_up_produces_a_notification() {
        let (engine, snapshot, mut history) = setup();
        let event = CompletionEvent::quest_step(
            "evt_quest",
            "user_engine",
            TaskCategory::Creativity,
            150,
            Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap(),
            false,
        );

        let outcome = engine
            .complete_step(&snapshot, &mut history, &event)
            .expect("completion");
        assert_eq!(outcome.levels_gained, 1);
        assert!(outcome
            .notifications
            .iter()
            .any(|notification| notification.message.contains("Level up")));
        // Quest steps do not count as tasks.
        assert_eq!(outcome.snapshot.tasks_completed, 0);
        assert_eq!(outcome.snapshot.quests_completed, 0);
    }

    #[test]
    fn final_quest_step_bumps_quest_counter() {
        let (engine, snapshot, mut history) = setup();
        let event = CompletionEvent::quest_step(
            "evt_quest_done",
            "user_engine",
            TaskCategory::Learning,
            50,
            Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap(),
            true,
        );

        let outcome = engine
            .complete_step(&snapshot, &mut history, &event)
            .expect("completion");
        assert_eq!(outcome.snapshot.quests_completed, 1);
    }

    #[test]
    fn roll_day_is_idempotent_within_a_day() {
        let (engine, snapshot, _) = setup();
        let today = snapshot.last_active_date.succ_opt().unwrap();
        let rolled = engine.roll_day(&snapshot, today);
        assert_eq!(rolled.streak_days, 1);
        let rolled_again = engine.roll_day(&rolled, today);
        assert_eq!(rolled_again, rolled);
    }
}
