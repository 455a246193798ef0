mod config;
pub mod database;
pub mod meal_log;
pub mod migrations;

pub use config::{Config, DisplayConfig, NotificationsConfig, NotifierConfig};
pub use database::SqliteMealLog;
pub use meal_log::{MealEvent, MealLog};

use std::path::PathBuf;

/// Returns the data directory.
///
/// `FASTING_DATA_DIR` wins when set. Otherwise `~/.config/fasting[-dev]/`,
/// with the `-dev` suffix when `FASTING_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("FASTING_DATA_DIR") {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FASTING_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("fasting-dev")
            } else {
                base_dir.join("fasting")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
