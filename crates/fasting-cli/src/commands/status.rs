use std::path::Path;

use chrono::Utc;
use fasting_core::Config;

use super::{open_clock, CommandResult};

/// Print the running fast as a `StateSnapshot` JSON document.
pub fn run(db: Option<&Path>, cfg: &Config) -> CommandResult {
    let clock = open_clock(db, cfg)?;
    let snapshot = clock.snapshot(Utc::now());
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
