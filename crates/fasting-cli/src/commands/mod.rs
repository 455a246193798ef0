use std::path::Path;

use chrono::Utc;
use fasting_core::{Config, FastingClock, SqliteMealLog};

pub mod config;
pub mod eat;
pub mod history;
pub mod import;
pub mod status;
pub mod watch;

pub type BoxError = Box<dyn std::error::Error>;
pub type CommandResult = Result<(), BoxError>;

/// Open the meal log: `--db` first, then the configured path.
pub fn open_log(db: Option<&Path>, cfg: &Config) -> Result<SqliteMealLog, BoxError> {
    let path = match db {
        Some(path) => path.to_path_buf(),
        None => cfg.database_path()?,
    };
    Ok(SqliteMealLog::open(path)?)
}

/// Open the log and build a clock whose process start is now.
pub fn open_clock(db: Option<&Path>, cfg: &Config) -> Result<FastingClock, BoxError> {
    let log = open_log(db, cfg)?;
    Ok(FastingClock::new(log, Utc::now())?)
}
