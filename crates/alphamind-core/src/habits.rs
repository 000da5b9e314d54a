//! Today's habit completion state.
//!
//! [`HabitStateManager`] owns the in-memory map for the current session.
//! Every mutation is two-phase: the store write happens first and the map is
//! only touched once it succeeds, after which the day's progress is
//! recomputed from the committed map. [`SyncStatus`] records how the last
//! operation went so callers can show whether the map is known to match the
//! store.

use std::sync::Arc;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{CoreError, StoreError, ValidationError};
use crate::model::{HabitRecord, UserId};
use crate::progress::{DailyProgress, ProgressAggregator, ReconcileReport};
use crate::storage::{default_habits, ProgressConfig, Store};

/// Habit name to completion flag, in display order: defaults first in their
/// fixed order, then custom names in the order they were encountered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitMap(IndexMap<String, bool>);

impl HabitMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every name present and not completed.
    pub fn from_names<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self(names.into_iter().map(|n| (n.into(), false)).collect())
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Set a flag, keeping the key's position if it already exists.
    pub fn set(&mut self, name: impl Into<String>, completed: bool) {
        self.0.insert(name.into(), completed);
    }

    /// Remove a key, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<bool> {
        self.0.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.0.values().filter(|done| **done).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, done)| (name.as_str(), *done))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<N: Into<String>> FromIterator<(N, bool)> for HabitMap {
    fn from_iter<T: IntoIterator<Item = (N, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, done)| (n.into(), done)).collect())
    }
}

/// Remote operation that last changed the sync state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Load,
    Toggle,
    Add,
    Remove,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncOperation::Load => "load",
            SyncOperation::Toggle => "toggle",
            SyncOperation::Add => "add",
            SyncOperation::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// Whether the in-memory map is known to match the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    /// The last remote operation failed; the map is as it was before the call.
    Failed {
        operation: SyncOperation,
        message: String,
    },
    /// The habit write landed but the derived progress writes did not.
    /// The next recompute or load repairs it.
    ProgressStale { message: String },
}

impl SyncStatus {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

/// Working copy of today's habits for one user.
pub struct HabitStateManager<S> {
    store: Arc<S>,
    user: UserId,
    clock: Arc<dyn Clock>,
    defaults: Vec<String>,
    progress: ProgressAggregator<S>,
    habits: HabitMap,
    loading: bool,
    status: SyncStatus,
    last_reconcile: Option<ReconcileReport>,
}

impl<S: Store> HabitStateManager<S> {
    pub fn new(store: Arc<S>, user: UserId, clock: Arc<dyn Clock>) -> Self {
        let defaults = default_habits();
        let progress = ProgressAggregator::new(Arc::clone(&store), user.clone(), Arc::clone(&clock));
        Self {
            store,
            user,
            clock,
            habits: HabitMap::from_names(defaults.iter().cloned()),
            defaults,
            progress,
            loading: false,
            status: SyncStatus::Synced,
            last_reconcile: None,
        }
    }

    /// Replace the default habit set seeded into every day.
    pub fn with_defaults(mut self, defaults: Vec<String>) -> Self {
        self.habits = HabitMap::from_names(defaults.iter().cloned());
        self.defaults = defaults;
        self
    }

    pub fn with_progress_config(mut self, config: ProgressConfig) -> Self {
        self.progress = self.progress.with_config(config);
        self
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn habits(&self) -> &HabitMap {
        &self.habits
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// What the read-repair pass of the last successful load rewrote.
    pub fn last_reconcile(&self) -> Option<&ReconcileReport> {
        self.last_reconcile.as_ref()
    }

    pub fn progress(&self) -> &ProgressAggregator<S> {
        &self.progress
    }

    /// Current score of the in-memory map, without touching the store.
    pub fn score(&self) -> DailyProgress {
        crate::progress::score(&self.habits)
    }

    /// Fetch today's records and overlay them on the defaults.
    ///
    /// Never fails: on a fetch error the map falls back to the plain
    /// defaults and the status records the failure. After a successful
    /// fetch the day's progress records are reconciled against the map.
    pub async fn load(&mut self) -> &HabitMap {
        self.loading = true;
        let today = self.clock.today();

        match self.fetch(today).await {
            Ok(map) => {
                self.habits = map;
                self.status = SyncStatus::Synced;
                match self.progress.reconcile(&self.habits).await {
                    Ok(report) => self.last_reconcile = Some(report),
                    Err(e) => {
                        tracing::warn!(user_id = %self.user, error = %e, "progress reconcile failed");
                        self.last_reconcile = None;
                        self.status = SyncStatus::ProgressStale {
                            message: e.to_string(),
                        };
                    }
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user, error = %e, "habit load failed, using defaults");
                self.habits = HabitMap::from_names(self.defaults.iter().cloned());
                self.status = SyncStatus::Failed {
                    operation: SyncOperation::Load,
                    message: e.to_string(),
                };
            }
        }

        self.loading = false;
        &self.habits
    }

    async fn fetch(&self, today: NaiveDate) -> Result<HabitMap, StoreError> {
        let removed = self.store.removed_habits(&self.user).await?;
        let records = self.store.habits_on(&self.user, today).await?;

        let mut map = HabitMap::from_names(
            self.defaults
                .iter()
                .filter(|name| !removed.contains(name))
                .cloned(),
        );
        for record in records {
            if removed.contains(&record.name) {
                continue;
            }
            map.set(record.name, record.completed);
        }
        tracing::debug!(user_id = %self.user, %today, habits = map.len(), "habits loaded");
        Ok(map)
    }

    /// Flip one habit. Returns the new value.
    ///
    /// An unknown name is treated as currently not completed and is
    /// inserted.
    pub async fn toggle(&mut self, name: &str) -> Result<bool, CoreError> {
        let name = habit_name(name)?;
        let known = self.habits.contains(name);
        let next = !self.habits.get(name).unwrap_or(false);
        let today = self.clock.today();

        let write = async {
            if !known {
                self.store
                    .set_habit_removed(&self.user, name, false, self.clock.now())
                    .await?;
            }
            self.write_habit(name, next, today).await
        };
        if let Err(e) = write.await {
            return Err(self.fail(SyncOperation::Toggle, name, e));
        }

        self.habits.set(name, next);
        self.refresh_progress().await;
        Ok(next)
    }

    /// Start tracking a new habit, not completed.
    pub async fn add(&mut self, name: &str) -> Result<(), CoreError> {
        let name = habit_name(name)?;
        if self.habits.contains(name) {
            return Err(ValidationError::DuplicateHabit(name.to_string()).into());
        }
        let today = self.clock.today();

        let write = async {
            self.store
                .set_habit_removed(&self.user, name, false, self.clock.now())
                .await?;
            self.write_habit(name, false, today).await
        };
        if let Err(e) = write.await {
            return Err(self.fail(SyncOperation::Add, name, e));
        }

        self.habits.set(name, false);
        self.refresh_progress().await;
        Ok(())
    }

    /// Stop tracking a habit and delete its records on every date.
    ///
    /// A tracked name is remembered as removed so a default never comes
    /// back on the next load. A name missing from today's map only has its
    /// older records purged, and is rejected when there are none. Returns
    /// the number of records deleted.
    pub async fn remove(&mut self, name: &str) -> Result<usize, CoreError> {
        let name = habit_name(name)?;
        if !self.habits.contains(name) {
            return self.purge_untracked(name).await;
        }
        let now = self.clock.now();

        if let Err(e) = self.store.set_habit_removed(&self.user, name, true, now).await {
            return Err(self.fail(SyncOperation::Remove, name, e));
        }

        let deleted = match self.store.delete_habits_named(&self.user, name).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(undo) = self.store.set_habit_removed(&self.user, name, false, now).await {
                    tracing::warn!(user_id = %self.user, habit = name, error = %undo, "could not clear removed mark");
                }
                return Err(self.fail(SyncOperation::Remove, name, e));
            }
        };

        self.habits.remove(name);
        self.refresh_progress().await;
        Ok(deleted)
    }

    async fn purge_untracked(&mut self, name: &str) -> Result<usize, CoreError> {
        match self.store.delete_habits_named(&self.user, name).await {
            Ok(0) => Err(ValidationError::UnknownHabit(name.to_string()).into()),
            Ok(deleted) => {
                tracing::debug!(user_id = %self.user, habit = name, deleted, "purged untracked habit");
                Ok(deleted)
            }
            Err(e) => Err(self.fail(SyncOperation::Remove, name, e)),
        }
    }

    // Read-before-write keeps one record per (user, name, date).
    async fn write_habit(&self, name: &str, completed: bool, date: NaiveDate) -> Result<(), StoreError> {
        if let Some(existing) = self.store.find_habit(&self.user, name, date).await? {
            if self.store.update_habit(&existing.id, completed).await? > 0 {
                return Ok(());
            }
        }
        let record = HabitRecord::new(&self.user, name, completed, date, self.clock.now());
        self.store.insert_habit(&record).await
    }

    async fn refresh_progress(&mut self) {
        match self.progress.recompute(&self.habits).await {
            Ok(_) => self.status = SyncStatus::Synced,
            Err(e) => {
                tracing::warn!(user_id = %self.user, error = %e, "progress recompute failed");
                self.status = SyncStatus::ProgressStale {
                    message: e.to_string(),
                };
            }
        }
    }

    fn fail(&mut self, operation: SyncOperation, name: &str, err: StoreError) -> CoreError {
        tracing::warn!(user_id = %self.user, habit = name, %operation, error = %err, "habit write failed");
        self.status = SyncStatus::Failed {
            operation,
            message: err.to_string(),
        };
        err.into()
    }
}

fn habit_name(raw: &str) -> Result<&str, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::Empty { field: "habit name" });
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::storage::SqliteStore;

    fn manager() -> HabitStateManager<SqliteStore> {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()));
        HabitStateManager::new(store, UserId::generate(), clock)
    }

    #[test]
    fn habit_map_keeps_insertion_order() {
        let mut map = HabitMap::from_names(["b", "a", "c"]);
        map.set("a", true);
        map.set("z", false);
        map.remove("b");
        let names: Vec<_> = map.names().collect();
        assert_eq!(names, ["a", "c", "z"]);
        assert_eq!(map.completed_count(), 1);
    }

    #[test]
    fn sync_status_serializes_with_tag() {
        let status = SyncStatus::Failed {
            operation: SyncOperation::Toggle,
            message: "boom".into(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["operation"], "toggle");
    }

    #[tokio::test]
    async fn starts_with_defaults_before_load() {
        let mgr = manager();
        assert_eq!(mgr.habits().len(), 8);
        assert_eq!(mgr.habits().completed_count(), 0);
        assert!(!mgr.is_loading());
    }

    #[tokio::test]
    async fn toggle_flips_only_one_key() {
        let mut mgr = manager();
        mgr.load().await;
        let before = mgr.habits().clone();

        assert!(mgr.toggle("Plan the day").await.unwrap());

        for (name, done) in mgr.habits().iter() {
            if name == "Plan the day" {
                assert!(done);
            } else {
                assert_eq!(Some(done), before.get(name));
            }
        }
        assert!(mgr.sync_status().is_synced());
    }

    #[tokio::test]
    async fn toggle_twice_reuses_the_same_record() {
        let mut mgr = manager();
        mgr.load().await;
        mgr.toggle("Meditate 10min").await.unwrap();
        assert!(!mgr.toggle("Meditate 10min").await.unwrap());

        let today = mgr.clock.today();
        let rows = mgr.store.habits_on(mgr.user(), today).await.unwrap();
        assert_eq!(rows.iter().filter(|r| r.name == "Meditate 10min").count(), 1);
    }

    #[tokio::test]
    async fn add_rejects_blank_and_duplicate_names() {
        let mut mgr = manager();
        mgr.load().await;
        let before = mgr.habits().clone();

        let blank = mgr.add("   ").await.unwrap_err();
        assert!(matches!(blank, CoreError::Validation(ValidationError::Empty { .. })));
        let dup = mgr.add(" Plan the day ").await.unwrap_err();
        assert!(matches!(dup, CoreError::Validation(ValidationError::DuplicateHabit(_))));

        assert_eq!(mgr.habits(), &before);
    }

    #[tokio::test]
    async fn custom_habit_appends_after_defaults() {
        let mut mgr = manager();
        mgr.load().await;
        mgr.add("  Journal ").await.unwrap();

        assert_eq!(mgr.habits().names().last(), Some("Journal"));
        assert_eq!(mgr.habits().get("Journal"), Some(false));
        assert_eq!(mgr.score().total, 9);
    }

    #[tokio::test]
    async fn remove_and_toggle_trim_the_name() {
        let mut mgr = manager();
        mgr.load().await;
        mgr.add("Journal").await.unwrap();

        assert!(mgr.toggle(" Journal\t").await.unwrap());
        assert_eq!(mgr.habits().get("Journal"), Some(true));

        assert_eq!(mgr.remove(" Journal ").await.unwrap(), 1);
        assert!(!mgr.habits().contains("Journal"));
        assert_eq!(mgr.habits().len(), 8);
    }

    #[tokio::test]
    async fn remove_of_unknown_name_is_rejected_without_a_mark() {
        let mut mgr = manager();
        mgr.load().await;
        let before = mgr.habits().clone();

        let err = mgr.remove(" Journal ").await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::UnknownHabit(ref n)) if n == "Journal"));
        let blank = mgr.remove("  ").await.unwrap_err();
        assert!(matches!(blank, CoreError::Validation(ValidationError::Empty { .. })));

        assert_eq!(mgr.habits(), &before);
        assert!(mgr.store.removed_habits(mgr.user()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_of_untracked_name_purges_older_records() {
        let mut mgr = manager();
        mgr.load().await;
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let old = HabitRecord::new(mgr.user(), "Journal", true, yesterday, mgr.clock.now());
        mgr.store.insert_habit(&old).await.unwrap();

        assert_eq!(mgr.remove("Journal").await.unwrap(), 1);
        assert!(mgr.store.habits_on(mgr.user(), yesterday).await.unwrap().is_empty());
        assert!(mgr.store.removed_habits(mgr.user()).await.unwrap().is_empty());
    }
}
