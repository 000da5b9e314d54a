//! # AlphaMind Core Library
//!
//! Business logic for the AlphaMind habit and goal tracker. Every operation
//! is available through the standalone CLI binary, which is a thin layer over
//! this crate.
//!
//! ## Architecture
//!
//! - **Storage**: a [`Store`] trait over five user-scoped collections, backed
//!   by SQLite ([`SqliteStore`], the default) or a PostgREST endpoint
//!   ([`RestStore`]), plus TOML configuration ([`Config`])
//! - **Identity**: a per-installation [`UserId`] persisted on first use and
//!   passed explicitly into every manager
//! - **Habits**: today's completion map, mutated two-phase with an observable
//!   [`SyncStatus`]
//! - **Progress**: discipline score, productive time, streaks and the
//!   read-repair pass that keeps the day's log and the summary row in step
//!
//! ## Key Components
//!
//! - [`HabitStateManager`]: load/toggle/add/remove of today's habits
//! - [`ProgressAggregator`]: score persistence, history and streaks
//! - [`ProfileManager`] / [`NotesManager`]: goals, onboarding, mindset notes
//! - [`FocusCycles`]: focus intervals to productive hours

pub mod clock;
pub mod error;
pub mod focus;
pub mod habits;
pub mod identity;
pub mod model;
pub mod notes;
pub mod profile;
pub mod progress;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, IdentityError, StoreError, ValidationError};
pub use focus::FocusCycles;
pub use habits::{HabitMap, HabitStateManager, SyncOperation, SyncStatus};
pub use identity::IdentityResolver;
pub use model::{
    GoalKind, HabitRecord, MindsetNote, ProgressLog, ProgressPatch, UserId, UserPatch, UserSummary,
};
pub use notes::NotesManager;
pub use profile::{OnboardingForm, ProfileManager};
pub use progress::{DailyProgress, ProgressAggregator, ReconcileReport};
pub use storage::{Config, RestConfig, RestStore, SqliteStore, Store, StoreBackend};
