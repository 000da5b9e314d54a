//! Goals, onboarding and the rest of the user summary row.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{CoreError, StoreError, ValidationError};
use crate::model::{GoalKind, UserId, UserPatch, UserSummary, DEFAULT_TARGET_SAVINGS};
use crate::storage::Store;

/// Badge granted when onboarding completes.
pub const WELCOME_BADGE: &str = "Welcome to AlphaMind";

/// Values collected by the onboarding flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnboardingForm {
    pub name: String,
    pub personal_goal: String,
    pub financial_goal: String,
    /// Free text as typed; see [`parse_target_savings`].
    pub target_savings: String,
}

/// Savings target from user text. Anything that is not a positive number
/// falls back to the default target.
pub fn parse_target_savings(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => DEFAULT_TARGET_SAVINGS,
    }
}

/// Percentage of the savings target reached, 0..=100.
pub fn savings_percent(summary: &UserSummary) -> f64 {
    if summary.target_savings <= 0.0 {
        return 0.0;
    }
    (summary.current_savings / summary.target_savings * 100.0).clamp(0.0, 100.0)
}

pub struct ProfileManager<S> {
    store: Arc<S>,
    user: UserId,
    clock: Arc<dyn Clock>,
}

impl<S: Store> ProfileManager<S> {
    pub fn new(store: Arc<S>, user: UserId, clock: Arc<dyn Clock>) -> Self {
        Self { store, user, clock }
    }

    /// The user's summary, creating the default row on first use.
    pub async fn load(&self) -> Result<UserSummary, StoreError> {
        if let Some(summary) = self.store.get_user(&self.user).await? {
            return Ok(summary);
        }
        let summary = UserSummary::new_for(&self.user, self.clock.now());
        self.store.insert_user(&summary).await?;
        tracing::info!(user_id = %self.user, "created user summary");
        Ok(summary)
    }

    pub async fn set_goal(&self, kind: GoalKind, value: &str) -> Result<UserSummary, CoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::Empty { field: "goal" }.into());
        }
        self.write(&kind.patch(value.to_string())).await?;
        Ok(self.load().await?)
    }

    /// Clear a goal. The row itself stays.
    pub async fn delete_goal(&self, kind: GoalKind) -> Result<UserSummary, StoreError> {
        self.write(&kind.patch(String::new())).await?;
        self.load().await
    }

    pub async fn complete_onboarding(&self, form: &OnboardingForm) -> Result<UserSummary, StoreError> {
        let patch = UserPatch {
            name: Some(form.name.trim().to_string()),
            personal_goal: Some(form.personal_goal.trim().to_string()),
            financial_goal: Some(form.financial_goal.trim().to_string()),
            current_savings: Some(0.0),
            target_savings: Some(parse_target_savings(&form.target_savings)),
            daily_discipline: Some(0),
            productive_time: Some(0.0),
            streak: Some(1),
            level: Some(1),
            badges: Some(vec![WELCOME_BADGE.to_string()]),
            completed_onboarding: Some(true),
        };
        self.write(&patch).await?;
        self.load().await
    }

    pub async fn savings_progress(&self) -> Result<f64, StoreError> {
        Ok(savings_percent(&self.load().await?))
    }

    async fn write(&self, patch: &UserPatch) -> Result<(), StoreError> {
        self.store
            .upsert_user(&self.user, patch, self.clock.now())
            .await
            .inspect_err(|e| tracing::warn!(user_id = %self.user, error = %e, "profile write failed"))
    }
}
