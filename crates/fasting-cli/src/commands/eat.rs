use std::path::Path;

use chrono::Utc;
use fasting_core::{Config, Event};

use super::{open_clock, CommandResult};

pub fn run(db: Option<&Path>, cfg: &Config, note: Option<&str>) -> CommandResult {
    let clock = open_clock(db, cfg)?;
    let meal = clock.record_meal(Utc::now(), note.map(str::trim))?;
    let event = Event::MealRecorded {
        meal_id: meal.id,
        note: meal.note,
        at: meal.timestamp,
    };
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}
