use std::error::Error;
use std::sync::Arc;

use alphamind_core::{FocusCycles, Store};
use clap::Subcommand;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Today's progress log
    Today,
    /// Recompute today's score from the habits
    Recompute,
    /// Recent daily logs, newest first
    History {
        /// Number of days (at most 30)
        #[arg(long, default_value_t = 7)]
        limit: usize,
    },
    /// Consecutive qualifying days, stored on the profile
    Streak,
    /// Set today's productive hours (replaces the current value)
    Time {
        /// Hours, e.g. 1.5
        #[arg(allow_negative_numbers = true)]
        hours: f64,
    },
    /// Record one completed focus cycle
    FocusComplete,
    /// Repair today's log and profile figures from the habits
    Reconcile,
}

pub async fn run<S: Store>(
    ctx: &Context,
    store: Arc<S>,
    action: ProgressAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        ProgressAction::Today => {
            let log = ctx.progress(store).today().await?;
            print_json(&log)?;
        }
        ProgressAction::Recompute => {
            let mut habits = ctx.habits(store);
            habits.load().await;
            let progress = habits.progress().recompute(habits.habits()).await?;
            print_json(&progress)?;
        }
        ProgressAction::History { limit } => {
            let logs = ctx.progress(store).history(limit).await?;
            print_json(&logs)?;
        }
        ProgressAction::Streak => {
            let streak = ctx.progress(store).refresh_streak().await?;
            println!("{streak}");
        }
        ProgressAction::Time { hours } => {
            ctx.progress(store).record_productive_time(hours).await?;
            println!("productive time: {hours:.2}h");
        }
        ProgressAction::FocusComplete => {
            let progress = ctx.progress(store);
            let focus = FocusCycles::from_config(&ctx.config.progress);
            let prior_hours = progress
                .today()
                .await?
                .map_or(0.0, |log| log.productive_hours);
            let (cycles, hours) = focus.next_after(prior_hours)?;
            progress.record_productive_time(hours).await?;
            println!("focus cycles today: {cycles} ({hours:.2}h)");
        }
        ProgressAction::Reconcile => {
            let mut habits = ctx.habits(store);
            habits.load().await;
            match habits.last_reconcile() {
                Some(report) => print_json(report)?,
                None => {
                    return Err(format!("reconcile failed: {:?}", habits.sync_status()).into());
                }
            }
        }
    }
    Ok(())
}
