//! Pure progression/reward kernel. No I/O, no clock: every operation takes
//! explicit snapshots, histories, and timestamps, and returns new values.

mod attribute;
mod catalog;
mod engine;
mod error;
mod history;
mod ledger;
mod level;
mod streak;
mod unlock;

pub use attribute::{attribute_for_category, derive_attribute_gain};
pub use catalog::{RewardCatalog, RewardDefinition, UnlockRule};
pub use engine::ProgressionEngine;
pub use error::EngineError;
pub use history::{
    any_record_before_hour, daily_task_counts, distinct_days_at_or_after_hour,
    longest_category_day_run, longest_daily_task_run, tasks_on_day,
};
pub use ledger::award_xp;
pub use level::xp_threshold;
pub use streak::update_streak;
pub use unlock::evaluate_unlocks;
