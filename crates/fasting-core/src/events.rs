use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{FastPhase, FastingTier, Threshold};

/// Every state change in the system produces an Event.
/// The CLI prints them as JSON; the notifier returns them from each tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    MealRecorded {
        meal_id: i64,
        note: String,
        at: DateTime<Utc>,
    },
    /// A threshold was reached for the first time in the running fast.
    ThresholdCrossed {
        threshold: Threshold,
        fast_started_at: DateTime<Utc>,
        elapsed_secs: i64,
        at: DateTime<Utc>,
    },
    NotifierStarted {
        poll_interval_secs: u64,
        at: DateTime<Utc>,
    },
    NotifierStopped {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        /// Start of the running fast.
        last_meal_at: DateTime<Utc>,
        /// True when no meal was ever recorded and the start is assumed.
        fallback: bool,
        elapsed_secs: i64,
        clock: String,
        total_hours: i64,
        tier: FastingTier,
        message: String,
        phase: FastPhase,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::ThresholdCrossed {
            threshold: Threshold::Ideal,
            fast_started_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            elapsed_secs: 18 * 3600,
            at: Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ThresholdCrossed");
        assert_eq!(json["threshold"], "ideal");
    }
}
