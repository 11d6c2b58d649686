//! v1 cross-boundary contracts for the progression kernel, API, persistence,
//! and stream consumers.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION_V1: &str = "1.0";

/// XP required to clear level 1; later thresholds are derived by the curve.
pub const BASE_XP_THRESHOLD: i64 = 100;

/// One attribute point is earned per this many XP in the mapped category.
pub const XP_PER_ATTRIBUTE_POINT: i64 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    Health,
    Work,
    Creativity,
    Social,
    Learning,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        Self::Health,
        Self::Work,
        Self::Creativity,
        Self::Social,
        Self::Learning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Work => "work",
            Self::Creativity => "creativity",
            Self::Social => "social",
            Self::Learning => "learning",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "health" => Some(Self::Health),
            "work" => Some(Self::Work),
            "creativity" => Some(Self::Creativity),
            "social" => Some(Self::Social),
            "learning" => Some(Self::Learning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Strength,
    Intelligence,
    Charisma,
    Dexterity,
    Wisdom,
    Vitality,
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 6] = [
        Self::Strength,
        Self::Intelligence,
        Self::Charisma,
        Self::Dexterity,
        Self::Wisdom,
        Self::Vitality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strength => "strength",
            Self::Intelligence => "intelligence",
            Self::Charisma => "charisma",
            Self::Dexterity => "dexterity",
            Self::Wisdom => "wisdom",
            Self::Vitality => "vitality",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskDifficulty {
    Easy,
    Medium,
    Hard,
}

impl TaskDifficulty {
    pub fn xp_value(self) -> i64 {
        match self {
            Self::Easy => 10,
            Self::Medium => 20,
            Self::Hard => 30,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QuestDifficulty {
    Easy,
    Medium,
    Hard,
    Legendary,
}

impl QuestDifficulty {
    pub fn xp_reward(self) -> i64 {
        match self {
            Self::Easy => 50,
            Self::Medium => 100,
            Self::Hard => 150,
            Self::Legendary => 300,
        }
    }

    /// XP granted per quest step: the quest reward split evenly across
    /// steps, rounded to the nearest whole point.
    pub fn step_xp(self, step_count: u32) -> i64 {
        if step_count == 0 {
            return self.xp_reward();
        }
        let reward = self.xp_reward() as f64;
        (reward / f64::from(step_count)).round() as i64
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            "legendary" => Some(Self::Legendary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Achievement,
    Badge,
    Equipment,
}

impl RewardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Achievement => "achievement",
            Self::Badge => "badge",
            Self::Equipment => "equipment",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    Task,
    QuestStep,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryXp {
    pub health: i64,
    pub work: i64,
    pub creativity: i64,
    pub social: i64,
    pub learning: i64,
}

impl CategoryXp {
    pub fn get(&self, category: TaskCategory) -> i64 {
        match category {
            TaskCategory::Health => self.health,
            TaskCategory::Work => self.work,
            TaskCategory::Creativity => self.creativity,
            TaskCategory::Social => self.social,
            TaskCategory::Learning => self.learning,
        }
    }

    pub fn add(&mut self, category: TaskCategory, amount: i64) {
        let slot = match category {
            TaskCategory::Health => &mut self.health,
            TaskCategory::Work => &mut self.work,
            TaskCategory::Creativity => &mut self.creativity,
            TaskCategory::Social => &mut self.social,
            TaskCategory::Learning => &mut self.learning,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn total(&self) -> i64 {
        TaskCategory::ALL
            .iter()
            .map(|category| self.get(*category))
            .sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = (TaskCategory, i64)> + '_ {
        TaskCategory::ALL
            .iter()
            .map(move |category| (*category, self.get(*category)))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeScores {
    pub strength: i64,
    pub intelligence: i64,
    pub charisma: i64,
    pub dexterity: i64,
    pub wisdom: i64,
    pub vitality: i64,
}

impl AttributeScores {
    pub fn get(&self, attribute: AttributeKind) -> i64 {
        match attribute {
            AttributeKind::Strength => self.strength,
            AttributeKind::Intelligence => self.intelligence,
            AttributeKind::Charisma => self.charisma,
            AttributeKind::Dexterity => self.dexterity,
            AttributeKind::Wisdom => self.wisdom,
            AttributeKind::Vitality => self.vitality,
        }
    }

    pub fn add(&mut self, attribute: AttributeKind, amount: i64) {
        let slot = match attribute {
            AttributeKind::Strength => &mut self.strength,
            AttributeKind::Intelligence => &mut self.intelligence,
            AttributeKind::Charisma => &mut self.charisma,
            AttributeKind::Dexterity => &mut self.dexterity,
            AttributeKind::Wisdom => &mut self.wisdom,
            AttributeKind::Vitality => &mut self.vitality,
        };
        *slot = slot.saturating_add(amount);
    }

    pub fn min_value(&self) -> i64 {
        AttributeKind::ALL
            .iter()
            .map(|attribute| self.get(*attribute))
            .min()
            .unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (AttributeKind, i64)> + '_ {
        AttributeKind::ALL
            .iter()
            .map(move |attribute| (*attribute, self.get(*attribute)))
    }
}

/// Complete progression state for one user. Owned by the orchestrator's
/// caller; mutated only by returning new values from kernel operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressionSnapshot {
    pub schema_version: String,
    pub user_id: String,
    pub level: u32,
    pub current_xp: i64,
    pub xp_to_next_level: i64,
    pub total_xp: i64,
    pub streak_days: u32,
    pub last_active_date: NaiveDate,
    pub account_created_at: DateTime<Utc>,
    pub tasks_completed: u64,
    pub quests_completed: u64,
    pub category_xp: CategoryXp,
    pub attributes: AttributeScores,
    /// Reward ids in first-unlock order.
    #[serde(default)]
    pub unlocked_reward_ids: Vec<String>,
}

impl ProgressionSnapshot {
    pub fn initial(user_id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            user_id: user_id.into(),
            level: 1,
            current_xp: 0,
            xp_to_next_level: BASE_XP_THRESHOLD,
            total_xp: 0,
            streak_days: 0,
            last_active_date: created_at.date_naive(),
            account_created_at: created_at,
            tasks_completed: 0,
            quests_completed: 0,
            category_xp: CategoryXp::default(),
            attributes: AttributeScores::default(),
            unlocked_reward_ids: Vec::new(),
        }
    }

    pub fn has_unlocked(&self, reward_id: &str) -> bool {
        self.unlocked_reward_ids
            .iter()
            .any(|unlocked| unlocked == reward_id)
    }
}

impl fmt::Display for ProgressionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "user_id={} level={} xp={}/{} total_xp={} streak_days={} unlocks={}",
            self.user_id,
            self.level,
            self.current_xp,
            self.xp_to_next_level,
            self.total_xp,
            self.streak_days,
            self.unlocked_reward_ids.len()
        )
    }
}

/// Ephemeral input to the completion orchestrator; only its effects are
/// persisted in the snapshot and activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionEvent {
    pub schema_version: String,
    pub event_id: String,
    pub user_id: String,
    pub kind: CompletionKind,
    pub category: TaskCategory,
    pub xp_amount: i64,
    pub occurred_at: DateTime<Utc>,
    /// True when this quest step is the one that finishes its quest.
    #[serde(default)]
    pub quest_completed: bool,
}

impl CompletionEvent {
    pub fn task(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        category: TaskCategory,
        xp_amount: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            event_id: event_id.into(),
            user_id: user_id.into(),
            kind: CompletionKind::Task,
            category,
            xp_amount,
            occurred_at,
            quest_completed: false,
        }
    }

    pub fn quest_step(
        event_id: impl Into<String>,
        user_id: impl Into<String>,
        category: TaskCategory,
        xp_amount: i64,
        occurred_at: DateTime<Utc>,
        quest_completed: bool,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            event_id: event_id.into(),
            user_id: user_id.into(),
            kind: CompletionKind::QuestStep,
            category,
            xp_amount,
            occurred_at,
            quest_completed,
        }
    }
}

/// One entry of the append-only activity log consumed by history-based
/// unlock predicates. The kernel only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityRecord {
    pub occurred_at: DateTime<Utc>,
    pub category: TaskCategory,
    pub kind: CompletionKind,
}

impl ActivityRecord {
    pub fn from_event(event: &CompletionEvent) -> Self {
        Self {
            occurred_at: event.occurred_at,
            category: event.category,
            kind: event.kind,
        }
    }
}

/// A reward granted during an evaluation pass, with the display metadata
/// callers surface to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnlockedReward {
    pub reward_id: String,
    pub kind: RewardKind,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    Info,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: NotificationSeverity,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: NotificationSeverity::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: NotificationSeverity::Success,
        }
    }
}

/// Everything a completion produced: the new snapshot plus the deltas the
/// caller persists and announces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub schema_version: String,
    pub user_id: String,
    pub snapshot: ProgressionSnapshot,
    pub newly_unlocked: Vec<UnlockedReward>,
    pub notifications: Vec<Notification>,
    pub levels_gained: u32,
}

/// Envelope for read-only API queries; `data` is shaped per `query_type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    pub schema_version: String,
    pub query_type: String,
    pub user_id: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ProfileNotFound,
    InvalidAward,
    InvalidQuery,
    ContractVersionUnsupported,
    ProfileStateConflict,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub schema_version: String,
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            error_code,
            message: message.into(),
            details,
        }
    }
}
