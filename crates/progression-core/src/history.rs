//! Read-only calendar queries over the caller-owned activity log. These
//! back the history-based unlock predicates; none of them mutate anything.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Timelike};
use contracts::{ActivityRecord, CompletionKind, TaskCategory};

/// Completed-task count per calendar day. Quest steps are not tasks and
/// are excluded.
pub fn daily_task_counts(records: &[ActivityRecord]) -> BTreeMap<NaiveDate, u32> {
    let mut counts = BTreeMap::new();
    for record in records {
        if record.kind != CompletionKind::Task {
            continue;
        }
        *counts.entry(record.occurred_at.date_naive()).or_insert(0) += 1;
    }
    counts
}

pub fn tasks_on_day(records: &[ActivityRecord], day: NaiveDate) -> u32 {
    records
        .iter()
        .filter(|record| {
            record.kind == CompletionKind::Task && record.occurred_at.date_naive() == day
        })
        .count() as u32
}

/// Longest run of consecutive calendar days that each have at least
/// `per_day_min` completed tasks.
pub fn longest_daily_task_run(records: &[ActivityRecord], per_day_min: u32) -> u32 {
    let qualifying = daily_task_counts(records)
        .into_iter()
        .filter(|(_, count)| *count >= per_day_min)
        .map(|(day, _)| day)
        .collect::<Vec<_>>();

    longest_consecutive_run(&qualifying)
}

/// Longest run of consecutive calendar days that each have at least one
/// record in `category`, regardless of kind.
pub fn longest_category_day_run(records: &[ActivityRecord], category: TaskCategory) -> u32 {
    let days = records
        .iter()
        .filter(|record| record.category == category)
        .map(|record| record.occurred_at.date_naive())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();

    longest_consecutive_run(&days)
}

/// Distinct calendar days with at least one record at or after `hour`
/// (0-23, UTC).
pub fn distinct_days_at_or_after_hour(records: &[ActivityRecord], hour: u32) -> usize {
    records
        .iter()
        .filter(|record| record.occurred_at.hour() >= hour)
        .map(|record| record.occurred_at.date_naive())
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn any_record_before_hour(records: &[ActivityRecord], hour: u32) -> bool {
    records
        .iter()
        .any(|record| record.occurred_at.hour() < hour)
}

fn longest_consecutive_run(sorted_days: &[NaiveDate]) -> u32 {
    let mut longest = 0_u32;
    let mut current = 0_u32;
    let mut previous: Option<NaiveDate> = None;

    for day in sorted_days {
        current = match previous {
            Some(prev) if prev.succ_opt() == Some(*day) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(*day);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 30, 0).unwrap()
    }

    fn task(day: u32, hour: u32, category: TaskCategory) -> ActivityRecord {
        ActivityRecord {
            occurred_at: at(day, hour),
            category,
            kind: CompletionKind::Task,
        }
    }

    fn quest_step(day: u32, hour: u32, category: TaskCategory) -> ActivityRecord {
        ActivityRecord {
            occurred_at: at(day, hour),
            category,
            kind: CompletionKind::QuestStep,
        }
    }

    #[test]
    fn daily_counts_exclude_quest_steps() {
        let records = vec![
            task(1, 9, TaskCategory::Work),
            task(1, 10, TaskCategory::Work),
            quest_step(1, 11, TaskCategory::Work),
        ];
        let counts = daily_task_counts(&records);
        assert_eq!(
            counts.get(&NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            Some(&2)
        );
        assert_eq!(tasks_on_day(&records, at(1, 0).date_naive()), 2);
    }

    #[test]
    fn run_breaks_on_missed_day() {
        let mut records = Vec::new();
        for day in [1, 2, 3, 5, 6] {
            for _ in 0..5 {
                records.push(task(day, 12, TaskCategory::Health));
            }
        }
        assert_eq!(longest_daily_task_run(&records, 5), 3);
        assert_eq!(longest_daily_task_run(&records, 6), 0);
    }

    #[test]
    fn run_ignores_days_below_minimum() {
        let mut records = Vec::new();
        for day in 1..=7 {
            let count = if day == 4 { 2 } else { 5 };
            for _ in 0..count {
                records.push(task(day, 12, TaskCategory::Work));
            }
        }
        // Day 4 only has 2 tasks, splitting the week into 3 + 3.
        assert_eq!(longest_daily_task_run(&records, 5), 3);
    }

    #[test]
    fn category_run_counts_distinct_consecutive_days() {
        let records = vec![
            task(1, 7, TaskCategory::Health),
            task(1, 19, TaskCategory::Health),
            task(2, 7, TaskCategory::Health),
            task(3, 7, TaskCategory::Work),
            task(4, 7, TaskCategory::Health),
        ];
        assert_eq!(longest_category_day_run(&records, TaskCategory::Health), 2);
        assert_eq!(longest_category_day_run(&records, TaskCategory::Work), 1);
        assert_eq!(
            longest_category_day_run(&records, TaskCategory::Creativity),
            0
        );
    }

    #[test]
    fn hour_queries() {
        let records = vec![
            task(1, 23, TaskCategory::Work),
            task(1, 22, TaskCategory::Work),
            task(2, 22, TaskCategory::Work),
            task(3, 9, TaskCategory::Work),
        ];
        assert_eq!(distinct_days_at_or_after_hour(&records, 22), 2);
        assert!(!any_record_before_hour(&records, 8));
        assert!(any_record_before_hour(&records, 10));
    }
}
