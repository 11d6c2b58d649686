use chrono::NaiveDate;
use contracts::ProgressionSnapshot;

/// Advance the consecutive-day streak to `today`.
///
/// Same calendar day is a no-op, the day after the last active date extends
/// the streak, and any larger gap (or a last active date in the future from
/// clock skew) restarts it at 1. Calling this repeatedly within one day is
/// therefore safe.
pub fn update_streak(snapshot: &ProgressionSnapshot, today: NaiveDate) -> ProgressionSnapshot {
    if today == snapshot.last_active_date {
        return snapshot.clone();
    }

    let mut updated = snapshot.clone();
    if snapshot.last_active_date.succ_opt() == Some(today) {
        updated.streak_days = updated.streak_days.saturating_add(1);
    } else {
        updated.streak_days = 1;
    }
    updated.last_active_date = today;
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot_active_on(date: NaiveDate, streak_days: u32) -> ProgressionSnapshot {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut snapshot = ProgressionSnapshot::initial("user_streak", created);
        snapshot.last_active_date = date;
        snapshot.streak_days = streak_days;
        snapshot
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn same_day_is_a_no_op() {
        let snapshot = snapshot_active_on(date(2024, 3, 10), 4);
        let updated = update_streak(&snapshot, date(2024, 3, 10));
        assert_eq!(updated, snapshot);
    }

    #[test]
    fn next_day_extends_the_streak() {
        let snapshot = snapshot_active_on(date(2024, 3, 10), 4);
        let updated = update_streak(&snapshot, date(2024, 3, 11));
        assert_eq!(updated.streak_days, 5);
        assert_eq!(updated.last_active_date, date(2024, 3, 11));
    }

    #[test]
    fn gap_resets_to_one() {
        let snapshot = snapshot_active_on(date(2024, 3, 10), 9);
        let updated = update_streak(&snapshot, date(2024, 3, 13));
        assert_eq!(updated.streak_days, 1);
        assert_eq!(updated.last_active_date, date(2024, 3, 13));
    }

    #[test]
    fn future_last_active_date_resets() {
        let snapshot = snapshot_active_on(date(2024, 3, 20), 9);
        let updated = update_streak(&snapshot, date(2024, 3, 13));
        assert_eq!(updated.streak_days, 1);
        assert_eq!(updated.last_active_date, date(2024, 3, 13));
    }

    #[test]
    fn month_boundary_counts_as_consecutive() {
        let snapshot = snapshot_active_on(date(2024, 2, 29), 2);
        let updated = update_streak(&snapshot, date(2024, 3, 1));
        assert_eq!(updated.streak_days, 3);
    }
}
