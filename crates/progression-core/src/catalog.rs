use chrono::NaiveDate;
use contracts::{
    ActivityRecord, AttributeKind, ProgressionSnapshot, RewardKind, TaskCategory, UnlockedReward,
};

use crate::history::{
    any_record_before_hour, distinct_days_at_or_after_hour, longest_category_day_run,
    longest_daily_task_run, tasks_on_day,
};

/// Closed set of unlock predicate shapes. Every rule is a pure, idempotent
/// check over the post-award snapshot and the read-only activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockRule {
    TasksCompleted { count: u64 },
    QuestsCompleted { count: u64 },
    StreakDays { days: u32 },
    LevelReached { level: u32 },
    AttributeAtLeast { attribute: AttributeKind, value: i64 },
    AllAttributesAtLeast { value: i64 },
    /// At least one record in `category` on each of `days` consecutive days.
    CategoryDayStreak { category: TaskCategory, days: u32 },
    /// At least `per_day` completed tasks on each of `days` consecutive days.
    TasksPerDayRun { per_day: u32, days: u32 },
    /// Activity at or after `hour` on at least `days` distinct days.
    ActivityAfterHourOnDays { hour: u32, days: u32 },
    /// Any activity strictly before `hour`.
    ActivityBeforeHour { hour: u32 },
    /// At least `count` tasks on the snapshot's active day.
    TasksToday { count: u32 },
    AccountCreatedBefore { date: NaiveDate },
}

impl UnlockRule {
    pub fn satisfied(&self, snapshot: &ProgressionSnapshot, history: &[ActivityRecord]) -> bool {
        match self {
            Self::TasksCompleted { count } => snapshot.tasks_completed >= *count,
            Self::QuestsCompleted { count } => snapshot.quests_completed >= *count,
            Self::StreakDays { days } => snapshot.streak_days >= *days,
            Self::LevelReached { level } => snapshot.level >= *level,
            Self::AttributeAtLeast { attribute, value } => {
                snapshot.attributes.get(*attribute) >= *value
            }
            Self::AllAttributesAtLeast { value } => snapshot.attributes.min_value() >= *value,
            Self::CategoryDayStreak { category, days } => {
                longest_category_day_run(history, *category) >= *days
            }
            Self::TasksPerDayRun { per_day, days } => {
                longest_daily_task_run(history, *per_day) >= *days
            }
            Self::ActivityAfterHourOnDays { hour, days } => {
                distinct_days_at_or_after_hour(history, *hour) >= *days as usize
            }
            Self::ActivityBeforeHour { hour } => any_record_before_hour(history, *hour),
            Self::TasksToday { count } => {
                tasks_on_day(history, snapshot.last_active_date) >= *count
            }
            Self::AccountCreatedBefore { date } => {
                snapshot.account_created_at.date_naive() < *date
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardDefinition {
    pub reward_id: &'static str,
    pub kind: RewardKind,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub rule: UnlockRule,
}

impl RewardDefinition {
    pub fn to_unlocked(&self) -> UnlockedReward {
        UnlockedReward {
            reward_id: self.reward_id.to_string(),
            kind: self.kind,
            name: self.name.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
        }
    }
}

/// Ordered, immutable reward definitions. Evaluation order is catalog
/// order: achievements, then badges, then equipment.
#[derive(Debug, Clone)]
pub struct RewardCatalog {
    definitions: Vec<RewardDefinition>,
}

impl RewardCatalog {
    pub fn iter(&self) -> impl Iterator<Item = &RewardDefinition> {
        self.definitions.iter()
    }

    pub fn get(&self, reward_id: &str) -> Option<&RewardDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.reward_id == reward_id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for RewardCatalog {
    fn default() -> Self {
        let achievement = |reward_id, name, description, icon, rule| RewardDefinition {
            reward_id,
            kind: RewardKind::Achievement,
            name,
            description,
            icon,
            rule,
        };
        let badge = |reward_id, name, description, icon, rule| RewardDefinition {
            reward_id,
            kind: RewardKind::Badge,
            name,
            description,
            icon,
            rule,
        };
        let equipment = |reward_id, name, description, icon, rule| RewardDefinition {
            reward_id,
            kind: RewardKind::Equipment,
            name,
            description,
            icon,
            rule,
        };

        let definitions = vec![
            achievement(
                "first_blood",
                "First Steps",
                "Complete your first task",
                "🩸",
                UnlockRule::TasksCompleted { count: 1 },
            ),
            achievement(
                "weekly_warrior",
                "Weekly Warrior",
                "Maintain a 7-day streak",
                "🏆",
                UnlockRule::StreakDays { days: 7 },
            ),
            achievement(
                "xp_grinder",
                "XP Grinder",
                "Reach level 10",
                "💎",
                UnlockRule::LevelReached { level: 10 },
            ),
            achievement(
                "mind_master",
                "Mind Master",
                "Reach 15 Intelligence",
                "🧠",
                UnlockRule::AttributeAtLeast {
                    attribute: AttributeKind::Intelligence,
                    value: 15,
                },
            ),
            achievement(
                "iron_body",
                "Iron Body",
                "Reach 20 Strength",
                "💪",
                UnlockRule::AttributeAtLeast {
                    attribute: AttributeKind::Strength,
                    value: 20,
                },
            ),
            achievement(
                "ritual_keeper",
                "Ritual Keeper",
                "Complete at least 1 task every day for 30 days",
                "📅",
                UnlockRule::StreakDays { days: 30 },
            ),
            achievement(
                "jack_of_all",
                "Jack of All Trades",
                "Reach 10 in all attributes",
                "🃏",
                UnlockRule::AllAttributesAtLeast { value: 10 },
            ),
            achievement(
                "no_rest",
                "No Rest for the Focused",
                "Complete 100 tasks",
                "🔥",
                UnlockRule::TasksCompleted { count: 100 },
            ),
            achievement(
                "quest_clearer",
                "Quest Clearer",
                "Finish 10 quests",
                "🎯",
                UnlockRule::QuestsCompleted { count: 10 },
            ),
            achievement(
                "zen_mode",
                "Zen Mode",
                "Meditate 7 days in a row",
                "🧘",
                UnlockRule::CategoryDayStreak {
                    category: TaskCategory::Health,
                    days: 7,
                },
            ),
            badge(
                "early_adopter",
                "Early Adopter",
                "Joined during the app's first release",
                "🌟",
                UnlockRule::AccountCreatedBefore {
                    date: NaiveDate::from_ymd_opt(2024, 7, 1).expect("valid cutoff"),
                },
            ),
            badge(
                "night_runner",
                "Night Runner",
                "Completed tasks after 10 PM for 5 days",
                "🌙",
                UnlockRule::ActivityAfterHourOnDays { hour: 22, days: 5 },
            ),
            badge(
                "discipline_king",
                "Discipline King",
                "30-day streak badge",
                "👑",
                UnlockRule::StreakDays { days: 30 },
            ),
            badge(
                "brainiac",
                "Brainiac",
                "Reached 25 Intelligence",
                "🧠",
                UnlockRule::AttributeAtLeast {
                    attribute: AttributeKind::Intelligence,
                    value: 25,
                },
            ),
            badge(
                "unstoppable",
                "Unstoppable",
                "7 days of completing 5+ tasks per day",
                "🚀",
                UnlockRule::TasksPerDayRun {
                    per_day: 5,
                    days: 7,
                },
            ),
            equipment(
                "headband_focus",
                "Headband of Focus",
                "+10% XP from reading tasks",
                "🎽",
                UnlockRule::AttributeAtLeast {
                    attribute: AttributeKind::Intelligence,
                    value: 10,
                },
            ),
            equipment(
                "boots_speed",
                "Swiftstep Boots",
                "Gain +1 Dexterity from every 5 tasks completed",
                "👟",
                UnlockRule::TasksCompleted { count: 25 },
            ),
            equipment(
                "gloves_grit",
                "Gloves of Grit",
                "Prevents streak loss once every 14 days",
                "🧤",
                UnlockRule::StreakDays { days: 14 },
            ),
            equipment(
                "cloak_knowledge",
                "Cloak of Knowledge",
                "+2 Intelligence if user completes 3+ tasks per day",
                "🧥",
                UnlockRule::TasksToday { count: 3 },
            ),
            equipment(
                "ring_discipline",
                "Ring of Discipline",
                "Grants bonus XP if task completed before 8 AM",
                "💍",
                UnlockRule::ActivityBeforeHour { hour: 8 },
            ),
        ];

        Self { definitions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn catalog_ids_are_unique() {
        let catalog = RewardCatalog::default();
        let ids = catalog
            .iter()
            .map(|definition| definition.reward_id)
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), catalog.len());
        assert_eq!(catalog.len(), 20);
    }

    #[test]
    fn kinds_are_grouped_in_catalog_order() {
        let catalog = RewardCatalog::default();
        let kinds = catalog
            .iter()
            .map(|definition| definition.kind)
            .collect::<Vec<_>>();
        let achievements = kinds
            .iter()
            .take_while(|kind| **kind == RewardKind::Achievement)
            .count();
        let badges = kinds
            .iter()
            .skip(achievements)
            .take_while(|kind| **kind == RewardKind::Badge)
            .count();
        assert_eq!(achievements, 10);
        assert_eq!(badges, 5);
        assert_eq!(kinds.len() - achievements - badges, 5);
    }

    #[test]
    fn lookup_by_id() {
        let catalog = RewardCatalog::default();
        let definition = catalog.get("weekly_warrior").expect("known reward");
        assert_eq!(definition.kind, RewardKind::Achievement);
        assert_eq!(definition.rule, UnlockRule::StreakDays { days: 7 });
        assert!(catalog.get("unknown_reward").is_none());
    }
}
