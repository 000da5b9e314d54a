//! Daily discipline score, productive time and streaks.
//!
//! The day's progress log and the user summary carry the same figures; both
//! are written through [`Store::write_daily_snapshot`] and [`ProgressAggregator::reconcile`]
//! repairs them when they drift from the habit map.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::{CoreError, StoreError, ValidationError};
use crate::habits::HabitMap;
use crate::model::{ProgressLog, ProgressPatch, UserId, UserPatch};
use crate::storage::{ProgressConfig, Store};

/// Score and counts for one habit map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DailyProgress {
    /// Percentage completed, 0..=100.
    pub score: u32,
    pub completed: u32,
    pub total: u32,
}

impl DailyProgress {
    fn patch(&self) -> ProgressPatch {
        ProgressPatch {
            discipline_score: Some(self.score),
            habits_completed: Some(self.completed),
            total_habits: Some(self.total),
            ..ProgressPatch::default()
        }
    }

    fn matches(&self, log: &ProgressLog) -> bool {
        log.discipline_score == self.score
            && log.habits_completed == self.completed
            && log.total_habits == self.total
    }
}

/// Percentage of habits completed, rounded half away from zero.
pub fn score(habits: &HabitMap) -> DailyProgress {
    let total = habits.len() as u32;
    let completed = habits.completed_count() as u32;
    DailyProgress {
        score: percent(completed, total),
        completed,
        total,
    }
}

// Integer form of round(100 * completed / total).
fn percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (c, t) = (u64::from(completed), u64::from(total));
    ((200 * c + t) / (2 * t)) as u32
}

/// Consecutive qualifying days ending `today`, or yesterday when today has
/// no qualifying log yet.
pub fn streak_from(logs: &[ProgressLog], today: NaiveDate, threshold: u32) -> u32 {
    let qualifying: HashSet<NaiveDate> = logs
        .iter()
        .filter(|log| log.discipline_score >= threshold)
        .map(|log| log.date)
        .collect();

    let start = if qualifying.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut count = 0;
    let mut day = start;
    while let Some(d) = day.filter(|d| qualifying.contains(d)) {
        count += 1;
        day = d.pred_opt();
    }
    count
}

/// What [`ProgressAggregator::reconcile`] had to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub expected: DailyProgress,
    pub progress_repaired: bool,
    pub summary_repaired: bool,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        !self.progress_repaired && !self.summary_repaired
    }
}

/// Derives and persists the per-day progress figures for one user.
pub struct ProgressAggregator<S> {
    store: Arc<S>,
    user: UserId,
    clock: Arc<dyn Clock>,
    config: ProgressConfig,
}

impl<S> Clone for ProgressAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            user: self.user.clone(),
            clock: Arc::clone(&self.clock),
            config: self.config.clone(),
        }
    }
}

impl<S: Store> ProgressAggregator<S> {
    pub fn new(store: Arc<S>, user: UserId, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            user,
            clock,
            config: ProgressConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProgressConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }

    /// Score `habits` and persist it as today's log and the summary's
    /// `daily_discipline`. `productive_hours` is left as stored.
    pub async fn recompute(&self, habits: &HabitMap) -> Result<DailyProgress, StoreError> {
        let progress = score(habits);
        let summary = UserPatch {
            daily_discipline: Some(progress.score),
            ..UserPatch::default()
        };
        self.store
            .write_daily_snapshot(
                &self.user,
                self.clock.today(),
                &progress.patch(),
                &summary,
                self.clock.now(),
            )
            .await?;
        tracing::debug!(user_id = %self.user, score = progress.score, "progress recomputed");
        Ok(progress)
    }

    /// Set today's productive hours to `hours`, replacing the prior value.
    pub async fn record_productive_time(&self, hours: f64) -> Result<(), CoreError> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "productive_hours".into(),
                message: format!("expected a non-negative number of hours, got {hours}"),
            }
            .into());
        }

        let progress = ProgressPatch {
            productive_hours: Some(hours),
            ..ProgressPatch::default()
        };
        let summary = UserPatch {
            productive_time: Some(hours),
            ..UserPatch::default()
        };
        self.store
            .write_daily_snapshot(&self.user, self.clock.today(), &progress, &summary, self.clock.now())
            .await
            .inspect_err(|e| tracing::warn!(user_id = %self.user, error = %e, "productive time write failed"))?;
        Ok(())
    }

    /// Today's stored log, if any.
    pub async fn today(&self) -> Result<Option<ProgressLog>, StoreError> {
        self.store.progress_on(&self.user, self.clock.today()).await
    }

    /// Read-repair: rewrite today's log and/or the summary when they disagree
    /// with `habits`.
    pub async fn reconcile(&self, habits: &HabitMap) -> Result<ReconcileReport, StoreError> {
        let expected = score(habits);
        let today = self.clock.today();
        let log = self.store.progress_on(&self.user, today).await?;
        let summary = self.store.get_user(&self.user).await?;

        let progress_stale = !log.as_ref().is_some_and(|log| expected.matches(log));
        let summary_stale = !summary
            .as_ref()
            .is_some_and(|s| s.daily_discipline == expected.score);

        let summary_patch = UserPatch {
            daily_discipline: Some(expected.score),
            ..UserPatch::default()
        };
        let now = self.clock.now();
        match (progress_stale, summary_stale) {
            (true, true) => {
                self.store
                    .write_daily_snapshot(&self.user, today, &expected.patch(), &summary_patch, now)
                    .await?
            }
            (true, false) => {
                self.store
                    .upsert_progress(&self.user, today, &expected.patch(), now)
                    .await?
            }
            (false, true) => self.store.upsert_user(&self.user, &summary_patch, now).await?,
            (false, false) => {}
        }

        let report = ReconcileReport {
            expected,
            progress_repaired: progress_stale,
            summary_repaired: summary_stale,
        };
        if !report.is_clean() {
            tracing::info!(
                user_id = %self.user,
                progress_repaired = report.progress_repaired,
                summary_repaired = report.summary_repaired,
                score = expected.score,
                "progress reconciled"
            );
        }
        Ok(report)
    }

    /// Most recent logs, newest first. `limit` is capped by the configured
    /// history window.
    pub async fn history(&self, limit: usize) -> Result<Vec<ProgressLog>, StoreError> {
        let limit = limit.min(self.config.history_window());
        self.store.recent_progress(&self.user, limit).await
    }

    /// Current streak as of today.
    pub async fn streak(&self) -> Result<u32, StoreError> {
        let logs = self
            .store
            .recent_progress(&self.user, self.config.history_window())
            .await?;
        Ok(streak_from(&logs, self.clock.today(), self.config.streak_threshold))
    }

    /// Compute the streak and store it on the summary.
    pub async fn refresh_streak(&self) -> Result<u32, StoreError> {
        let streak = self.streak().await?;
        let patch = UserPatch {
            streak: Some(streak),
            ..UserPatch::default()
        };
        self.store.upsert_user(&self.user, &patch, self.clock.now()).await?;
        Ok(streak)
    }
}
