//! The meal log contract.
//!
//! A meal log is an append-only, chronologically ordered record of meals.
//! It knows nothing about fasting thresholds; the clock derives everything
//! else from `most_recent()`.

use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Format used by databases written before timestamps were stored as UTC.
pub const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A recorded meal. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealEvent {
    /// Insertion order; breaks ties between equal timestamps.
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// Free text, empty when the user left no note.
    #[serde(default)]
    pub note: String,
}

impl MealEvent {
    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }

    /// One history line, e.g. `2024-01-01 08:00 - oatmeal`, in local time.
    pub fn history_line(&self) -> String {
        let local = self.timestamp.with_timezone(&Local);
        let mut line = local.format("%Y-%m-%d %H:%M").to_string();
        if self.has_note() {
            line.push_str(" - ");
            line.push_str(self.note.trim());
        }
        line
    }
}

/// Durable, append-only meal storage.
///
/// Implementations must make `append` durable before returning `Ok`, and
/// must report read failures as errors rather than as an empty log.
pub trait MealLog: Send {
    /// Append a meal. The timestamp must not precede the most recent meal.
    fn append(
        &mut self,
        timestamp: DateTime<Utc>,
        note: &str,
    ) -> Result<MealEvent, PersistenceError>;

    /// Latest meal by timestamp, then insertion order.
    fn most_recent(&self) -> Result<Option<MealEvent>, PersistenceError>;

    /// Up to `n` meals, most recent first.
    fn recent(&self, n: usize) -> Result<Vec<MealEvent>, PersistenceError>;
}

/// Drop sub-second precision; meals are recorded at second resolution.
pub fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Storage form: RFC 3339, UTC, whole seconds (`2024-01-01T08:00:00Z`).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and the legacy `YYYY-MM-DD HH:MM:SS` form, which is
/// interpreted as local time.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, LEGACY_TIMESTAMP_FORMAT)
        .map_err(|_| PersistenceError::InvalidTimestamp(raw.to_string()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| PersistenceError::InvalidTimestamp(raw.to_string()))
}
