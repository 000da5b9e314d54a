//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use alphamind_core::{
    Clock, FixedClock, HabitMap, HabitRecord, HabitStateManager, MindsetNote, ProgressLog,
    ProgressPatch, SqliteStore, Store, StoreError, UserId, UserPatch, UserSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub fn day(month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, d).unwrap()
}

pub fn clock_on(date: NaiveDate) -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(date))
}

pub fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_memory().unwrap())
}

/// Manager over `store` for `user`, pinned to `date`, already loaded.
pub async fn loaded_manager<S: Store>(
    store: &Arc<S>,
    user: &UserId,
    date: NaiveDate,
) -> HabitStateManager<S> {
    let mut mgr = HabitStateManager::new(Arc::clone(store), user.clone(), clock_on(date));
    mgr.load().await;
    mgr
}

pub fn names(map: &HabitMap) -> Vec<String> {
    map.names().map(String::from).collect()
}

/// Store operations a [`FlakyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    HabitsOn,
    FindHabit,
    InsertHabit,
    UpdateHabit,
    DeleteHabits,
    RemovedHabits,
    SetRemoved,
    Snapshot,
    UpsertProgress,
    UpsertUser,
}

/// Wraps a SQLite store and fails selected operations on demand.
pub struct FlakyStore {
    pub inner: SqliteStore,
    failing: Mutex<HashSet<Op>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_memory().unwrap(),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: Op) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    fn check(&self, op: Op) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&op) {
            return Err(StoreError::Status {
                status: 503,
                body: format!("injected failure in {op:?}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn get_user(&self, user: &UserId) -> Result<Option<UserSummary>, StoreError> {
        self.inner.get_user(user).await
    }

    async fn insert_user(&self, summary: &UserSummary) -> Result<(), StoreError> {
        self.check(Op::UpsertUser)?;
        self.inner.insert_user(summary).await
    }

    async fn upsert_user(
        &self,
        user: &UserId,
        patch: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check(Op::UpsertUser)?;
        self.inner.upsert_user(user, patch, at).await
    }

    async fn habits_on(&self, user: &UserId, date: NaiveDate) -> Result<Vec<HabitRecord>, StoreError> {
        self.check(Op::HabitsOn)?;
        self.inner.habits_on(user, date).await
    }

    async fn find_habit(
        &self,
        user: &UserId,
        name: &str,
        date: NaiveDate,
    ) -> Result<Option<HabitRecord>, StoreError> {
        self.check(Op::FindHabit)?;
        self.inner.find_habit(user, name, date).await
    }

    async fn insert_habit(&self, record: &HabitRecord) -> Result<(), StoreError> {
        self.check(Op::InsertHabit)?;
        self.inner.insert_habit(record).await
    }

    async fn update_habit(&self, id: &str, completed: bool) -> Result<usize, StoreError> {
        self.check(Op::UpdateHabit)?;
        self.inner.update_habit(id, completed).await
    }

    async fn delete_habits_named(&self, user: &UserId, name: &str) -> Result<usize, StoreError> {
        self.check(Op::DeleteHabits)?;
        self.inner.delete_habits_named(user, name).await
    }

    async fn removed_habits(&self, user: &UserId) -> Result<Vec<String>, StoreError> {
        self.check(Op::RemovedHabits)?;
        self.inner.removed_habits(user).await
    }

    async fn set_habit_removed(
        &self,
        user: &UserId,
        name: &str,
        removed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check(Op::SetRemoved)?;
        self.inner.set_habit_removed(user, name, removed, at).await
    }

    async fn progress_on(&self, user: &UserId, date: NaiveDate) -> Result<Option<ProgressLog>, StoreError> {
        self.inner.progress_on(user, date).await
    }

    async fn recent_progress(&self, user: &UserId, limit: usize) -> Result<Vec<ProgressLog>, StoreError> {
        self.inner.recent_progress(user, limit).await
    }

    async fn upsert_progress(
        &self,
        user: &UserId,
        date: NaiveDate,
        patch: &ProgressPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check(Op::UpsertProgress)?;
        self.inner.upsert_progress(user, date, patch, at).await
    }

    async fn write_daily_snapshot(
        &self,
        user: &UserId,
        date: NaiveDate,
        progress: &ProgressPatch,
        summary: &UserPatch,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check(Op::Snapshot)?;
        self.inner
            .write_daily_snapshot(user, date, progress, summary, at)
            .await
    }

    async fn insert_note(&self, note: &MindsetNote) -> Result<(), StoreError> {
        self.inner.insert_note(note).await
    }

    async fn list_notes(&self, user: &UserId) -> Result<Vec<MindsetNote>, StoreError> {
        self.inner.list_notes(user).await
    }

    async fn delete_note(&self, user: &UserId, id: &str) -> Result<usize, StoreError> {
        self.inner.delete_note(user, id).await
    }
}
