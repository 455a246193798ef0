use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fasting_core::Config;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "fasting-cli", version, about = "Fasting clock CLI")]
struct Cli {
    /// Meal log database to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the running fast as JSON
    Status,
    /// Record a meal now and start a new fast
    Eat {
        /// What you ate (optional)
        #[arg(long)]
        note: Option<String>,
    },
    /// Show the most recent meals
    History {
        /// Number of meals to show (default: display.history_limit)
        #[arg(long, short)]
        limit: Option<usize>,
        /// Print JSON instead of numbered lines
        #[arg(long)]
        json: bool,
    },
    /// Live clock with threshold notifications, until Ctrl-C
    Watch {
        /// Print notifier events as JSON lines instead of the live clock
        #[arg(long)]
        json: bool,
    },
    /// Import meals from the legacy desktop app's database
    Import {
        /// Path to the legacy fasting_app.db
        #[arg(long, value_name = "PATH")]
        from: PathBuf,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    logging::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> commands::CommandResult {
    // Config commands load the file themselves so `reset` works on a broken one.
    if let Commands::Config { action } = cli.command {
        return commands::config::run(action);
    }
    let cfg = Config::load()?;
    let db = cli.db.as_deref();
    match cli.command {
        Commands::Status => commands::status::run(db, &cfg),
        Commands::Eat { note } => commands::eat::run(db, &cfg, note.as_deref()),
        Commands::History { limit, json } => commands::history::run(db, &cfg, limit, json),
        Commands::Watch { json } => commands::watch::run(db, &cfg, json),
        Commands::Import { from } => commands::import::run(db, &cfg, &from),
        Commands::Config { .. } => Ok(()),
    }
}
