//! Row types for the four user-scoped collections plus the partial-merge
//! patches that mutate them.
//!
//! Field names match the column names of the remote tables so the same
//! structs serialize straight into REST payloads.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::IdentityError;

/// Default savings target for a fresh profile.
pub const DEFAULT_TARGET_SAVINGS: f64 = 10_000.0;

/// Stable per-installation user identifier (UUIDv4 text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a stored identifier, rejecting anything that is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        Uuid::parse_str(trimmed)
            .map(|uuid| Self(uuid.to_string()))
            .map_err(|_| IdentityError::InvalidFormat(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row per user: profile, goals and the denormalized progress figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub personal_goal: String,
    pub financial_goal: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub current_savings: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub target_savings: f64,
    pub daily_discipline: u32,
    /// Running total of productive hours (fractional).
    #[serde(deserialize_with = "lenient_f64")]
    pub productive_time: f64,
    pub streak: u32,
    pub level: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub badges: Vec<String>,
    pub completed_onboarding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for UserSummary {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            personal_goal: String::new(),
            financial_goal: String::new(),
            current_savings: 0.0,
            target_savings: DEFAULT_TARGET_SAVINGS,
            daily_discipline: 0,
            productive_time: 0.0,
            streak: 0,
            level: 1,
            badges: Vec::new(),
            completed_onboarding: false,
            created_at: None,
            updated_at: None,
        }
    }
}

impl UserSummary {
    /// Fresh row for a user seen for the first time.
    pub fn new_for(user: &UserId, at: DateTime<Utc>) -> Self {
        Self {
            id: user.as_str().to_string(),
            created_at: Some(at),
            updated_at: Some(at),
            ..Self::default()
        }
    }
}

/// Partial update of a [`UserSummary`]. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_goal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_savings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_savings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_discipline: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub productive_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_onboarding: Option<bool>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the supplied fields into `summary`, leaving the rest untouched.
    pub fn apply_to(&self, summary: &mut UserSummary) {
        if let Some(v) = &self.name {
            summary.name = v.clone();
        }
        if let Some(v) = &self.personal_goal {
            summary.personal_goal = v.clone();
        }
        if let Some(v) = &self.financial_goal {
            summary.financial_goal = v.clone();
        }
        if let Some(v) = self.current_savings {
            summary.current_savings = v;
        }
        if let Some(v) = self.target_savings {
            summary.target_savings = v;
        }
        if let Some(v) = self.daily_discipline {
            summary.daily_discipline = v;
        }
        if let Some(v) = self.productive_time {
            summary.productive_time = v;
        }
        if let Some(v) = self.streak {
            summary.streak = v;
        }
        if let Some(v) = self.level {
            summary.level = v;
        }
        if let Some(v) = &self.badges {
            summary.badges = v.clone();
        }
        if let Some(v) = self.completed_onboarding {
            summary.completed_onboarding = v;
        }
    }
}

/// Completion state of one habit on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub completed: bool,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl HabitRecord {
    pub fn new(user: &UserId, name: &str, completed: bool, date: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user.as_str().to_string(),
            name: name.to_string(),
            completed,
            date,
            created_at: Some(at),
        }
    }
}

/// Per-day derived snapshot. At most one row per (user, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLog {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    pub discipline_score: u32,
    #[serde(deserialize_with = "lenient_f64")]
    pub productive_hours: f64,
    pub habits_completed: u32,
    pub total_habits: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProgressLog {
    /// Zeroed row for (user, date), the base a patch merges onto when no
    /// row exists yet.
    pub fn empty(user: &UserId, date: NaiveDate, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user.as_str().to_string(),
            date,
            discipline_score: 0,
            productive_hours: 0.0,
            habits_completed: 0,
            total_habits: 0,
            created_at: Some(at),
        }
    }
}

/// Partial upsert of a [`ProgressLog`]. Absent fields keep their stored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discipline_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub productive_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub habits_completed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_habits: Option<u32>,
}

impl ProgressPatch {
    pub fn apply_to(&self, log: &mut ProgressLog) {
        if let Some(v) = self.discipline_score {
            log.discipline_score = v;
        }
        if let Some(v) = self.productive_hours {
            log.productive_hours = v;
        }
        if let Some(v) = self.habits_completed {
            log.habits_completed = v;
        }
        if let Some(v) = self.total_habits {
            log.total_habits = v;
        }
    }
}

/// Free-text reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindsetNote {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MindsetNote {
    pub fn new(user: &UserId, content: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user.as_str().to_string(),
            content: content.to_string(),
            created_at: at,
        }
    }
}

/// Which of the two goal strings on the summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalKind {
    Personal,
    Financial,
}

impl GoalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalKind::Personal => "personal",
            GoalKind::Financial => "financial",
        }
    }

    /// Patch that writes only this goal's field.
    pub fn patch(&self, value: String) -> UserPatch {
        match self {
            GoalKind::Personal => UserPatch {
                personal_goal: Some(value),
                ..UserPatch::default()
            },
            GoalKind::Financial => UserPatch {
                financial_goal: Some(value),
                ..UserPatch::default()
            },
        }
    }
}

impl std::str::FromStr for GoalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "personal" => Ok(GoalKind::Personal),
            "financial" => Ok(GoalKind::Financial),
            other => Err(format!("unknown goal kind: {other}")),
        }
    }
}

// Postgres `numeric` columns come back from PostgREST as JSON strings.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0.0),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
