use std::path::Path;

use fasting_core::Config;

use super::{open_log, CommandResult};

/// Copy meals from an old `fasting_app.db` into an empty meal log.
pub fn run(db: Option<&Path>, cfg: &Config, from: &Path) -> CommandResult {
    let mut log = open_log(db, cfg)?;
    let imported = log.import_legacy(from)?;
    println!("imported {imported} meals from {}", from.display());
    Ok(())
}
