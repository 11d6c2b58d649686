//! In-process API facade over the progression kernel: profile state
//! management, completion orchestration, and SQLite persistence.

mod persistence;
mod server;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use contracts::{
    ActivityRecord, CompletionEvent, CompletionOutcome, ProgressionSnapshot,
};
use persistence::SqliteProfileStore;
pub use persistence::{PersistedProfileSummary, PersistenceError, UnlockEntry};
use progression_core::{EngineError, ProgressionEngine, RewardCatalog};
pub use server::{serve, ServerError};

#[derive(Debug)]
pub enum FacadeError {
    Engine(EngineError),
    Persistence(PersistenceError),
}

impl fmt::Display for FacadeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for FacadeError {}

impl From<EngineError> for FacadeError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<PersistenceError> for FacadeError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

#[derive(Debug)]
struct ProfileState {
    snapshot: ProgressionSnapshot,
    history: Vec<ActivityRecord>,
    completion_log: Vec<CompletionEvent>,
    unlock_log: Vec<UnlockEntry>,
    persisted_completion_count: usize,
    persisted_activity_count: usize,
    persisted_unlock_count: usize,
}

impl ProfileState {
    fn fresh(snapshot: ProgressionSnapshot) -> Self {
        Self {
            snapshot,
            history: Vec::new(),
            completion_log: Vec::new(),
            unlock_log: Vec::new(),
            persisted_completion_count: 0,
            persisted_activity_count: 0,
            persisted_unlock_count: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct EngineApi {
    engine: ProgressionEngine,
    profiles: BTreeMap<String, ProfileState>,
    store: Option<SqliteProfileStore>,
    last_persistence_error: Option<String>,
}

impl EngineApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let store = SqliteProfileStore::open(path)?;
        self.store = Some(store);
        Ok(())
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn catalog(&self) -> &RewardCatalog {
        self.engine.catalog()
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    /// Create a new profile. With `replace_existing`, any in-memory and
    /// persisted state for the user is dropped first; otherwise an existing
    /// profile is a conflict.
    pub fn create_profile(
        &mut self,
        user_id: &str,
        created_at: DateTime<Utc>,
        replace_existing: bool,
    ) -> Result<ProgressionSnapshot, PersistenceError> {
        let exists_in_memory = self.profiles.contains_key(user_id);
        let exists_in_store = match self.store.as_ref() {
            Some(store) => store.profile_exists(user_id)?,
            None => false,
        };

        if exists_in_memory || exists_in_store {
            if !replace_existing {
                return Err(PersistenceError::ProfileAlreadyExists(user_id.to_string()));
            }
            self.profiles.remove(user_id);
            if let Some(store) = self.store.as_mut() {
                store.delete_profile(user_id)?;
            }
        }

        let snapshot = ProgressionSnapshot::initial(user_id, created_at);
        self.profiles
            .insert(user_id.to_string(), ProfileState::fresh(snapshot.clone()));
        self.flush_persistence_if_enabled();
        Ok(snapshot)
    }

    /// Make sure a profile is resident, loading it from the store if it is
    /// only persisted.
    pub fn open_profile(&mut self, user_id: &str) -> Result<&ProgressionSnapshot, FacadeError> {
        self.hydrate_if_needed(user_id)?;
        Ok(&self
            .profiles
            .get(user_id)
            .expect("profile resident after hydration")
            .snapshot)
    }

    /// Run the completion pipeline for one event and persist the delta.
    /// Persistence failures do not fail the completion; they are recorded
    /// and the flush can be retried.
    pub fn complete(&mut self, event: &CompletionEvent) -> Result<CompletionOutcome, FacadeError> {
        self.hydrate_if_needed(&event.user_id)?;
        let state = self
            .profiles
            .get_mut(&event.user_id)
            .expect("profile resident after hydration");

        let outcome = self
            .engine
            .complete_step(&state.snapshot, &mut state.history, event)?;

        state.snapshot = outcome.snapshot.clone();
        state.completion_log.push(event.clone());
        let unlock_base = state.unlock_log.len() as u64;
        for (offset, reward) in outcome.newly_unlocked.iter().enumerate() {
            state.unlock_log.push(UnlockEntry {
                reward: reward.clone(),
                unlock_order: unlock_base + offset as u64,
                unlocked_at: event.occurred_at,
            });
        }

        self.flush_persistence_if_enabled();
        Ok(outcome)
    }

    /// Login / day-rollover streak advance for one profile.
    pub fn roll_day(
        &mut self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<ProgressionSnapshot, FacadeError> {
        self.hydrate_if_needed(user_id)?;
        let state = self
            .profiles
            .get_mut(user_id)
            .expect("profile resident after hydration");

        state.snapshot = self.engine.roll_day(&state.snapshot, today);
        let snapshot = state.snapshot.clone();
        self.flush_persistence_if_enabled();
        Ok(snapshot)
    }

    /// User ids currently loaded in memory.
    pub fn resident_profiles(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn snapshot(&self, user_id: &str) -> Option<&ProgressionSnapshot> {
        self.profiles.get(user_id).map(|state| &state.snapshot)
    }

    pub fn history(&self, user_id: &str) -> Option<&[ActivityRecord]> {
        self.profiles
            .get(user_id)
            .map(|state| state.history.as_slice())
    }

    pub fn unlocks(&self, user_id: &str) -> Option<&[UnlockEntry]> {
        self.profiles
            .get(user_id)
            .map(|state| state.unlock_log.as_slice())
    }

    pub fn completions(&self, user_id: &str) -> Option<&[CompletionEvent]> {
        self.profiles
            .get(user_id)
            .map(|state| state.completion_log.as_slice())
    }

    /// Write every profile's unpersisted tail to the store.
    pub fn flush_persistence_checked(&mut self) -> Result<(), PersistenceError> {
        let Some(store) = self.store.as_mut() else {
            return Err(PersistenceError::NotAttached);
        };

        for state in self.profiles.values_mut() {
            let new_completions = &state.completion_log[state.persisted_completion_count..];
            let new_activity = &state.history[state.persisted_activity_count..];
            let new_unlocks = &state.unlock_log[state.persisted_unlock_count..];

            store.persist_delta(
                &state.snapshot,
                new_completions,
                state.persisted_activity_count as u64,
                new_activity,
                new_unlocks,
            )?;

            state.persisted_completion_count = state.completion_log.len();
            state.persisted_activity_count = state.history.len();
            state.persisted_unlock_count = state.unlock_log.len();
        }

        self.last_persistence_error = None;
        Ok(())
    }

    fn flush_persistence_if_enabled(&mut self) {
        if self.store.is_none() {
            return;
        }

        if let Err(err) = self.flush_persistence_checked() {
            self.last_persistence_error = Some(err.to_string());
        }
    }

    fn hydrate_if_needed(&mut self, user_id: &str) -> Result<(), PersistenceError> {
        if self.profiles.contains_key(user_id) {
            return Ok(());
        }

        let Some(store) = self.store.as_ref() else {
            return Err(PersistenceError::ProfileNotFound(user_id.to_string()));
        };

        let Some(snapshot) = store.load_profile(user_id)? else {
            return Err(PersistenceError::ProfileNotFound(user_id.to_string()));
        };

        let history = store.load_activity(user_id)?;
        let completion_log = store.load_completions(user_id)?;
        let unlock_log = store.load_unlocks(user_id)?;

        let state = ProfileState {
            persisted_completion_count: completion_log.len(),
            persisted_activity_count: history.len(),
            persisted_unlock_count: unlock_log.len(),
            snapshot,
            history,
            completion_log,
            unlock_log,
        };
        self.profiles.insert(user_id.to_string(), state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::TaskCategory;

    fn temp_db_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();

        std::env::temp_dir().join(format!("dailyxp_{name}_{nanos}.sqlite"))
    }

    fn cleanup(path: &std::path::Path) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(path.with_extension("sqlite-wal"));
        let _ = std::fs::remove_file(path.with_extension("sqlite-shm"));
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 7, 0, 0).unwrap()
    }

    #[test]
    fn completion_without_profile_is_not_found() {
        let mut api = EngineApi::new();
        let event = CompletionEvent::task(
            "evt_1",
            "user_missing",
            TaskCategory::Work,
            20,
            created_at(),
        );
        let err = api.complete(&event).unwrap_err();
        assert!(matches!(
            err,
            FacadeError::Persistence(PersistenceError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn create_then_complete_updates_memory_state() {
        let mut api = EngineApi::new();
        api.create_profile("user_mem", created_at(), false)
            .expect("create");

        let event = CompletionEvent::task(
            "evt_1",
            "user_mem",
            TaskCategory::Learning,
            30,
            created_at(),
        );
        let outcome = api.complete(&event).expect("complete");
        assert_eq!(outcome.snapshot.total_xp, 30);
        assert!(outcome
            .newly_unlocked
            .iter()
            .any(|reward| reward.reward_id == "first_blood"));

        assert_eq!(api.snapshot("user_mem").expect("snapshot").total_xp, 30);
        assert_eq!(api.history("user_mem").expect("history").len(), 1);
        assert_eq!(api.unlocks("user_mem").expect("unlocks").len(), 1);
    }

    #[test]
    fn duplicate_create_requires_replace_flag() {
        let mut api = EngineApi::new();
        api.create_profile("user_dup", created_at(), false)
            .expect("create");
        let err = api
            .create_profile("user_dup", created_at(), false)
            .unwrap_err();
        assert!(matches!(err, PersistenceError::ProfileAlreadyExists(_)));

        let snapshot = api
            .create_profile("user_dup", created_at(), true)
            .expect("replace");
        assert_eq!(snapshot.total_xp, 0);
    }

    #[test]
    fn persists_and_rehydrates_profiles() {
        let db_path = temp_db_path("rehydrate");
        let user_id = "user_persist";

        {
            let mut api = EngineApi::new();
            api.attach_sqlite_store(&db_path).expect("attach");
            api.create_profile(user_id, created_at(), true)
                .expect("create");

            for index in 0..3 {
                let event = CompletionEvent::task(
                    format!("evt_{index}"),
                    user_id,
                    TaskCategory::Health,
                    30,
                    created_at(),
                );
                api.complete(&event).expect("complete");
            }
            api.flush_persistence_checked().expect("flush");
            assert!(api.last_persistence_error().is_none());
        }

        let mut api = EngineApi::new();
        api.attach_sqlite_store(&db_path).expect("attach");
        let snapshot = api.open_profile(user_id).expect("open").clone();
        assert_eq!(snapshot.total_xp, 90);
        assert_eq!(snapshot.tasks_completed, 3);
        assert_eq!(api.history(user_id).expect("history").len(), 3);
        let unlock_ids = api
            .unlocks(user_id)
            .expect("unlocks")
            .iter()
            .map(|entry| entry.reward.reward_id.clone())
            .collect::<Vec<_>>();
        assert_eq!(snapshot.unlocked_reward_ids, unlock_ids);

        // Further completions continue from the persisted state.
        let event = CompletionEvent::task("evt_more", user_id, TaskCategory::Health, 30, created_at());
        let outcome = api.complete(&event).expect("complete");
        assert_eq!(outcome.snapshot.total_xp, 120);

        cleanup(&db_path);
    }

    #[test]
    fn flush_is_retryable_without_recomputation() {
        let db_path = temp_db_path("retry");
        let mut api = EngineApi::new();
        api.attach_sqlite_store(&db_path).expect("attach");
        api.create_profile("user_retry", created_at(), true)
            .expect("create");

        let event =
            CompletionEvent::task("evt_1", "user_retry", TaskCategory::Work, 20, created_at());
        api.complete(&event).expect("complete");

        // A second flush writes nothing new and succeeds.
        api.flush_persistence_checked().expect("flush");
        api.flush_persistence_checked().expect("flush again");

        cleanup(&db_path);
    }
}
