use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use contracts::{ActivityRecord, CompletionEvent, ProgressionSnapshot, UnlockedReward};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// One granted reward with its position in the user's unlock order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockEntry {
    pub reward: UnlockedReward,
    pub unlock_order: u64,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedProfileSummary {
    pub user_id: String,
    pub level: u32,
    pub total_xp: i64,
    pub streak_days: u32,
    pub updated_at: String,
}

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotAttached,
    ProfileAlreadyExists(String),
    ProfileNotFound(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
            Self::NotAttached => write!(f, "sqlite store is not attached"),
            Self::ProfileAlreadyExists(user_id) => {
                write!(f, "profile already exists: {user_id}")
            }
            Self::ProfileNotFound(user_id) => write!(f, "profile not found: {user_id}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

#[derive(Debug)]
pub struct SqliteProfileStore {
    conn: Connection,
}

impl SqliteProfileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    /// Write one profile's unpersisted tail: snapshot upsert plus the new
    /// completion, activity, and unlock rows, in one transaction. Append
    /// tables use INSERT OR IGNORE so a retried flush is harmless.
    pub fn persist_delta(
        &mut self,
        snapshot: &ProgressionSnapshot,
        completions: &[CompletionEvent],
        activity_start_seq: u64,
        activity: &[ActivityRecord],
        unlocks: &[UnlockEntry],
    ) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;

        upsert_profile(&tx, snapshot)?;

        for event in completions {
            let payload_json = serde_json::to_string(event)?;
            tx.execute(
                "INSERT OR IGNORE INTO completions (
                    user_id,
                    event_id,
                    occurred_at,
                    kind,
                    category,
                    xp_amount,
                    payload_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.user_id.as_str(),
                    event.event_id.as_str(),
                    event.occurred_at.to_rfc3339(),
                    format!("{:?}", event.kind),
                    event.category.as_str(),
                    event.xp_amount,
                    payload_json,
                ],
            )?;
        }

        for (offset, record) in activity.iter().enumerate() {
            let payload_json = serde_json::to_string(record)?;
            tx.execute(
                "INSERT OR IGNORE INTO activity (
                    user_id,
                    seq,
                    occurred_at,
                    category,
                    payload_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    snapshot.user_id.as_str(),
                    i64::try_from(activity_start_seq + offset as u64).unwrap_or(i64::MAX),
                    record.occurred_at.to_rfc3339(),
                    record.category.as_str(),
                    payload_json,
                ],
            )?;
        }

        for entry in unlocks {
            let payload_json = serde_json::to_string(entry)?;
            tx.execute(
                "INSERT OR IGNORE INTO unlocks (
                    user_id,
                    reward_id,
                    kind,
                    unlock_order,
                    unlocked_at,
                    payload_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    snapshot.user_id.as_str(),
                    entry.reward.reward_id.as_str(),
                    entry.reward.kind.as_str(),
                    i64::try_from(entry.unlock_order).unwrap_or(i64::MAX),
                    entry.unlocked_at.to_rfc3339(),
                    payload_json,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn profile_exists(&self, user_id: &str) -> Result<bool, PersistenceError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_profile(&mut self, user_id: &str) -> Result<(), PersistenceError> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM unlocks WHERE user_id = ?1", params![user_id])?;
        tx.execute("DELETE FROM activity WHERE user_id = ?1", params![user_id])?;
        tx.execute(
            "DELETE FROM completions WHERE user_id = ?1",
            params![user_id],
        )?;
        tx.execute("DELETE FROM profiles WHERE user_id = ?1", params![user_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn load_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<ProgressionSnapshot>, PersistenceError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot_json FROM profiles WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str::<ProgressionSnapshot>(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn load_activity(&self, user_id: &str) -> Result<Vec<ActivityRecord>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload_json FROM activity WHERE user_id = ?1 ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let payload = row?;
            records.push(serde_json::from_str::<ActivityRecord>(&payload)?);
        }
        Ok(records)
    }

    pub fn load_completions(
        &self,
        user_id: &str,
    ) -> Result<Vec<CompletionEvent>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload_json FROM completions WHERE user_id = ?1 ORDER BY occurred_at ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

        let mut events = Vec::new();
        for row in rows {
            let payload = row?;
            events.push(serde_json::from_str::<CompletionEvent>(&payload)?);
        }
        Ok(events)
    }

    pub fn load_unlocks(&self, user_id: &str) -> Result<Vec<UnlockEntry>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT payload_json FROM unlocks WHERE user_id = ?1 ORDER BY unlock_order ASC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;

        let mut entries = Vec::new();
        for row in rows {
            let payload = row?;
            entries.push(serde_json::from_str::<UnlockEntry>(&payload)?);
        }
        Ok(entries)
    }

    pub fn list_profiles(
        &self,
        page_size: usize,
    ) -> Result<Vec<PersistedProfileSummary>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, level, total_xp, streak_days, updated_at
             FROM profiles
             ORDER BY user_id ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![i64::try_from(page_size).unwrap_or(i64::MAX)], |row| {
            Ok(PersistedProfileSummary {
                user_id: row.get(0)?,
                level: row.get::<_, i64>(1)? as u32,
                total_xp: row.get(2)?,
                streak_days: row.get::<_, i64>(3)? as u32,
                updated_at: row.get(4)?,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS profiles (
                user_id TEXT PRIMARY KEY,
                schema_version TEXT NOT NULL,
                snapshot_json TEXT NOT NULL,
                level INTEGER NOT NULL,
                total_xp INTEGER NOT NULL,
                streak_days INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS completions (
                user_id TEXT NOT NULL,
                event_id TEXT NOT NULL,
                occurred_at TEXT NOT NULL,
                kind TEXT NOT NULL,
                category TEXT NOT NULL,
                xp_amount INTEGER NOT NULL,
                payload_json TEXT NOT NULL,
                PRIMARY KEY (user_id, event_id)
            );

            CREATE TABLE IF NOT EXISTS activity (
                user_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                occurred_at TEXT NOT NULL,
                category TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                PRIMARY KEY (user_id, seq)
            );

            CREATE TABLE IF NOT EXISTS unlocks (
                user_id TEXT NOT NULL,
                reward_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                unlock_order INTEGER NOT NULL,
                unlocked_at TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                PRIMARY KEY (user_id, reward_id)
            );

            CREATE INDEX IF NOT EXISTS idx_completions_user_time ON completions(user_id, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_activity_user_time ON activity(user_id, occurred_at);
            CREATE INDEX IF NOT EXISTS idx_unlocks_user_order ON unlocks(user_id, unlock_order);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name, applied_at)
             VALUES(1, 'initial_v1', 'bootstrap')",
            [],
        )?;

        Ok(())
    }
}

fn upsert_profile(
    tx: &rusqlite::Transaction<'_>,
    snapshot: &ProgressionSnapshot,
) -> Result<(), PersistenceError> {
    let snapshot_json = serde_json::to_string(snapshot)?;

    tx.execute(
        "INSERT INTO profiles (
            user_id,
            schema_version,
            snapshot_json,
            level,
            total_xp,
            streak_days,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(user_id) DO UPDATE SET
            schema_version = excluded.schema_version,
            snapshot_json = excluded.snapshot_json,
            level = excluded.level,
            total_xp = excluded.total_xp,
            streak_days = excluded.streak_days,
            updated_at = excluded.updated_at",
        params![
            snapshot.user_id.as_str(),
            snapshot.schema_version.as_str(),
            snapshot_json,
            i64::from(snapshot.level),
            snapshot.total_xp,
            i64::from(snapshot.streak_days),
            snapshot.account_created_at.to_rfc3339(),
            snapshot.last_active_date.to_string(),
        ],
    )?;

    Ok(())
}
