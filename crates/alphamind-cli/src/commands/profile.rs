//! Profile commands.
//!
//! `onboard` performs the final write of the onboarding flow; collecting
//! the answers interactively is left to whatever front end drives it.

use std::error::Error;
use std::sync::Arc;

use alphamind_core::profile::savings_percent;
use alphamind_core::{OnboardingForm, Store};
use clap::Subcommand;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile with savings progress
    Show,
    /// Complete onboarding
    Onboard {
        #[arg(long)]
        name: String,
        #[arg(long)]
        personal_goal: String,
        #[arg(long)]
        financial_goal: String,
        /// Savings target; anything that is not a positive number means 10000
        #[arg(long, default_value = "")]
        target_savings: String,
    },
}

pub async fn run<S: Store>(
    ctx: &Context,
    store: Arc<S>,
    action: ProfileAction,
) -> Result<(), Box<dyn Error>> {
    let profile = ctx.profile(store);
    let summary = match action {
        ProfileAction::Show => profile.load().await?,
        ProfileAction::Onboard {
            name,
            personal_goal,
            financial_goal,
            target_savings,
        } => {
            let form = OnboardingForm {
                name,
                personal_goal,
                financial_goal,
                target_savings,
            };
            profile.complete_onboarding(&form).await?
        }
    };
    print_json(&json!({
        "profile": summary,
        "savings_progress": savings_percent(&summary),
    }))
}
