//! # Fasting Core Library
//!
//! Core logic for the fasting clock: how long since the last meal, and a
//! notification the first time a fast reaches 12 hours (minimum) and
//! 18 hours (ideal). The CLI binary is a thin front-end over this crate.
//!
//! ## Architecture
//!
//! - **Meal Log**: append-only, SQLite-backed record of meals
//! - **Fasting Clock**: elapsed time derived from the last meal on every query
//! - **Threshold Notifier**: cancellable tokio task polling the clock and
//!   firing each threshold once per fast
//!
//! ## Key Components
//!
//! - [`FastingClock`]: elapsed time, meal recording, crossing record
//! - [`ThresholdNotifier`]: poll loop and notification channels
//! - [`SqliteMealLog`]: meal persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;

pub use clock::{FastPhase, FastingClock, FastingTier, Threshold};
pub use error::{ConfigError, CoreError, NotifyError, PersistenceError};
pub use events::Event;
pub use notify::{NotificationSink, NotifierHandle, ThresholdNotice, ThresholdNotifier};
pub use storage::{Config, MealEvent, MealLog, SqliteMealLog};
