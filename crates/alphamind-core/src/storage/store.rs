//! The tabular store seam.
//!
//! Five collections (`users`, `habits`, `progress_logs`, `mindset_notes`,
//! `removed_habits`) reached through typed forms of five verbs: select,
//! insert, update-by-filter, delete-by-filter and upsert-by-key. Every call
//! is scoped by the owning user. A point lookup that finds nothing returns
//! `Ok(None)`; only genuine failures are errors.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::model::{HabitRecord, MindsetNote, ProgressLog, ProgressPatch, UserId, UserPatch, UserSummary};

#[async_trait]
pub trait Store: Send + Sync {
    // ── users ────────────────────────────────────────────────────────

    async fn get_user(&self, user: &UserId) -> Result<Option<UserSummary>, StoreError>;

    async fn insert_user(&self, summary: &UserSummary) -> Result<(), StoreError>;

    /// Create-or-merge: only the fields present in `patch` change; a missing
    /// row is created from defaults first.
    async fn upsert_user(
        &self,
        user: &UserId,
        patch: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ── habits ───────────────────────────────────────────────────────

    async fn habits_on(&self, user: &UserId, date: NaiveDate) -> Result<Vec<HabitRecord>, StoreError>;

    async fn find_habit(
        &self,
        user: &UserId,
        name: &str,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StoreError>;

    async fn insert_habit(&self, record: &HabitRecord) -> Result<(), StoreError>;

    /// Returns the number of rows updated.
    async fn update_habit(&self, id: &str, completed: bool) -> Result<usize, StoreError>;

    /// Deletes every dated record for (user, name). Returns rows deleted.
    async fn delete_habits_named(&self, user: &UserId, name: &str) -> Result<usize, StoreError>;

    async fn removed_habits(&self, user: &UserId) -> Result<Vec<String>, StoreError>;

    async fn set_habit_removed(
        &self,
        user: &UserId,
        name: &str,
        removed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // ── progress logs ────────────────────────────────────────────────

    async fn progress_on(&self, user: &UserId, date: NaiveDate) -> Result<Option<ProgressLog>, StoreError>;

    /// Most recent logs, newest date first.
    async fn recent_progress(&self, user: &UserId, limit: usize) -> Result<Vec<ProgressLog>, StoreError>;

    /// Create-or-merge on (user, date).
    async fn upsert_progress(
        &self,
        user: &UserId,
        date: NaiveDate,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Writes the day's progress log and the matching summary fields.
    ///
    /// The default issues the two upserts back to back with no joint
    /// atomicity; backends with transactions override it.
    async fn write_daily_snapshot(
        &self,
        user: &UserId,
        date: NaiveDate,
        progress: &ProgressPatch,
        summary: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.upsert_progress(user, date, progress, at).await?;
        self.upsert_user(user, summary, at).await
    }

    // ── mindset notes ────────────────────────────────────────────────

    async fn insert_note(&self, note: &MindsetNote) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_notes(&self, user: &UserId) -> Result<Vec<MindsetNote>, StoreError>;

    async fn delete_note(&self, user: &UserId, id: &str) -> Result<usize, StoreError>;
}
