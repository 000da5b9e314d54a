use std::error::Error;
use std::sync::Arc;

use alphamind_core::{GoalKind, Store};
use clap::Subcommand;
use serde_json::json;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Show both goals
    Show,
    /// Set a goal
    Set {
        /// "personal" or "financial"
        kind: GoalKind,
        /// Goal text
        text: String,
    },
    /// Clear a goal
    Delete {
        /// "personal" or "financial"
        kind: GoalKind,
    },
}

pub async fn run<S: Store>(
    ctx: &Context,
    store: Arc<S>,
    action: GoalAction,
) -> Result<(), Box<dyn Error>> {
    let profile = ctx.profile(store);
    let summary = match action {
        GoalAction::Show => profile.load().await?,
        GoalAction::Set { kind, text } => profile.set_goal(kind, &text).await?,
        GoalAction::Delete { kind } => profile.delete_goal(kind).await?,
    };
    print_json(&json!({
        "personal": summary.personal_goal,
        "financial": summary.financial_goal,
    }))
}
