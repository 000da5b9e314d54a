use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "alphamind-cli", version, about = "AlphaMind habit and goal tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print this installation's user id
    Whoami,
    /// Today's habits
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Discipline score, productive time and streaks
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Personal and financial goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Mindset notes
    Note {
        #[command(subcommand)]
        action: commands::note::NoteAction,
    },
    /// Profile and onboarding
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("ALPHAMIND_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // LOG_FORMAT=json for machine consumption, human-readable otherwise
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Whoami => commands::whoami::run(),
        Commands::Config { action } => commands::config::run(action),
        Commands::Habit { action } => commands::run(commands::StoreCommand::Habit(action)).await,
        Commands::Progress { action } => {
            commands::run(commands::StoreCommand::Progress(action)).await
        }
        Commands::Goal { action } => commands::run(commands::StoreCommand::Goal(action)).await,
        Commands::Note { action } => commands::run(commands::StoreCommand::Note(action)).await,
        Commands::Profile { action } => {
            commands::run(commands::StoreCommand::Profile(action)).await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
