use std::error::Error;
use std::sync::Arc;

use alphamind_core::Store;
use clap::Subcommand;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum NoteAction {
    /// List notes, newest first
    List,
    /// Save a note
    Add {
        /// Note text
        text: String,
    },
    /// Delete a note by id
    Delete {
        /// Note id (from `note list`)
        id: String,
    },
}

pub async fn run<S: Store>(
    ctx: &Context,
    store: Arc<S>,
    action: NoteAction,
) -> Result<(), Box<dyn Error>> {
    let mut notes = ctx.notes(store);
    match action {
        NoteAction::List => print_json(notes.load().await?),
        NoteAction::Add { text } => {
            let list = notes.save(&text).await?;
            if let Some(note) = list.first() {
                println!("note saved: {}", note.id);
            }
            Ok(())
        }
        NoteAction::Delete { id } => {
            let remaining = notes.delete(&id).await?.len();
            println!("note deleted ({remaining} remaining)");
            Ok(())
        }
    }
}
