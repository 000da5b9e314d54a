use std::error::Error;
use std::sync::Arc;

use alphamind_core::{HabitStateManager, Store, SyncStatus};
use clap::Subcommand;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Show today's habits and score
    List,
    /// Flip a habit's completion for today
    Toggle {
        /// Habit name, exactly as listed
        name: String,
    },
    /// Start tracking a new habit
    Add {
        /// Habit name
        name: String,
    },
    /// Stop tracking a habit and delete its history
    Remove {
        /// Habit name, exactly as listed
        name: String,
    },
}

pub async fn run<S: Store>(
    ctx: &Context,
    store: Arc<S>,
    action: HabitAction,
) -> Result<(), Box<dyn Error>> {
    let mut mgr = ctx.habits(store);
    mgr.load().await;

    match action {
        HabitAction::List => {
            print_json(&json!({
                "habits": mgr.habits(),
                "progress": mgr.score(),
                "sync": mgr.sync_status(),
            }))?;
        }
        HabitAction::Toggle { name } => {
            ensure_loaded(&mgr)?;
            let done = mgr.toggle(&name).await?;
            println!("{}: {}", name.trim(), if done { "done" } else { "not done" });
            print_score(&mgr);
        }
        HabitAction::Add { name } => {
            ensure_loaded(&mgr)?;
            mgr.add(&name).await?;
            println!("added: {}", name.trim());
            print_score(&mgr);
        }
        HabitAction::Remove { name } => {
            ensure_loaded(&mgr)?;
            let deleted = mgr.remove(&name).await?;
            println!("removed: {} ({deleted} records deleted)", name.trim());
            print_score(&mgr);
        }
    }

    if let SyncStatus::ProgressStale { message } = mgr.sync_status() {
        eprintln!("warning: progress not saved: {message}");
    }
    Ok(())
}

// Mutating on top of the fallback defaults would write the wrong state.
fn ensure_loaded<S: Store>(mgr: &HabitStateManager<S>) -> Result<(), Box<dyn Error>> {
    if let SyncStatus::Failed { message, .. } = mgr.sync_status() {
        return Err(format!("could not load habits: {message}").into());
    }
    Ok(())
}

fn print_score<S: Store>(mgr: &HabitStateManager<S>) {
    let progress = mgr.score();
    println!(
        "discipline: {}% ({}/{})",
        progress.score, progress.completed, progress.total
    );
}
