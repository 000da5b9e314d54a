pub mod config;
pub mod goal;
pub mod habit;
pub mod note;
pub mod profile;
pub mod progress;
pub mod whoami;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use alphamind_core::storage::data_dir;
use alphamind_core::{
    Clock, Config, HabitStateManager, IdentityResolver, NotesManager, ProfileManager,
    ProgressAggregator, RestStore, SqliteStore, Store, StoreBackend, SystemClock, UserId,
};

/// Commands that need an open store.
pub enum StoreCommand {
    Habit(habit::HabitAction),
    Progress(progress::ProgressAction),
    Goal(goal::GoalAction),
    Note(note::NoteAction),
    Profile(profile::ProfileAction),
}

/// Everything a store-backed command needs besides the store itself.
pub struct Context {
    pub dir: PathBuf,
    pub config: Config,
    pub user: UserId,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    pub fn load() -> Result<Self, Box<dyn Error>> {
        let dir = data_dir()?;
        let config = Config::load_from(&dir.join("config.toml"))?;
        let user = IdentityResolver::new(&dir).resolve()?;
        Ok(Self {
            dir,
            config,
            user,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn habits<S: Store>(&self, store: Arc<S>) -> HabitStateManager<S> {
        HabitStateManager::new(store, self.user.clone(), Arc::clone(&self.clock))
            .with_defaults(self.config.habits.defaults.clone())
            .with_progress_config(self.config.progress.clone())
    }

    pub fn progress<S: Store>(&self, store: Arc<S>) -> ProgressAggregator<S> {
        ProgressAggregator::new(store, self.user.clone(), Arc::clone(&self.clock))
            .with_config(self.config.progress.clone())
    }

    pub fn profile<S: Store>(&self, store: Arc<S>) -> ProfileManager<S> {
        ProfileManager::new(store, self.user.clone(), Arc::clone(&self.clock))
    }

    pub fn notes<S: Store>(&self, store: Arc<S>) -> NotesManager<S> {
        NotesManager::new(store, self.user.clone(), Arc::clone(&self.clock))
    }
}

/// Open the configured backend and run `command` against it.
pub async fn run(command: StoreCommand) -> Result<(), Box<dyn Error>> {
    let ctx = Context::load()?;
    match ctx.config.store.backend {
        StoreBackend::Sqlite => {
            let path = ctx.config.store.sqlite_path(&ctx.dir);
            tracing::debug!(path = %path.display(), "opening sqlite store");
            let store = Arc::new(SqliteStore::open(&path)?);
            dispatch(&ctx, store, command).await
        }
        StoreBackend::Rest => {
            let store = Arc::new(RestStore::new(ctx.config.store.rest_config())?);
            dispatch(&ctx, store, command).await
        }
    }
}

async fn dispatch<S: Store>(
    ctx: &Context,
    store: Arc<S>,
    command: StoreCommand,
) -> Result<(), Box<dyn Error>> {
    match command {
        StoreCommand::Habit(action) => habit::run(ctx, store, action).await,
        StoreCommand::Progress(action) => progress::run(ctx, store, action).await,
        StoreCommand::Goal(action) => goal::run(ctx, store, action).await,
        StoreCommand::Note(action) => note::run(ctx, store, action).await,
        StoreCommand::Profile(action) => profile::run(ctx, store, action).await,
    }
}

/// Print structured output.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
