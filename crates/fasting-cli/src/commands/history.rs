use std::path::Path;

use fasting_core::{Config, MealLog};

use super::{open_log, CommandResult};

pub fn run(db: Option<&Path>, cfg: &Config, limit: Option<usize>, json: bool) -> CommandResult {
    let log = open_log(db, cfg)?;
    let meals = log.recent(limit.unwrap_or(cfg.display.history_limit))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meals)?);
        return Ok(());
    }

    if meals.is_empty() {
        println!("No meals recorded");
        return Ok(());
    }
    for (i, meal) in meals.iter().enumerate() {
        println!("{}. {}", i + 1, meal.history_line());
    }
    Ok(())
}
