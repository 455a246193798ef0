//! Pure formatting of elapsed fasting time.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::thresholds::{IDEAL_HOURS, MINIMUM_HOURS};

/// Whole hours in `elapsed`, days folded in. Negative input counts as zero.
pub fn total_hours(elapsed: Duration) -> i64 {
    elapsed.num_seconds().max(0) / 3600
}

/// `HH:MM:SS`, with days folded into the hour field (`26:05:09`).
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Where the current fast stands relative to the two goals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum FastingTier {
    /// `h < 12`
    BelowMinimum { hours_remaining: i64 },
    /// `12 <= h < 18`
    MinimumReached { hours_to_ideal: i64 },
    /// `h >= 18`
    IdealReached,
}

impl FastingTier {
    /// Classify by total hours. Each boundary belongs to the tier above it.
    pub fn from_total_hours(hours: i64) -> Self {
        let hours = hours.max(0);
        if hours < MINIMUM_HOURS {
            FastingTier::BelowMinimum {
                hours_remaining: MINIMUM_HOURS - hours,
            }
        } else if hours < IDEAL_HOURS {
            FastingTier::MinimumReached {
                hours_to_ideal: IDEAL_HOURS - hours,
            }
        } else {
            FastingTier::IdealReached
        }
    }

    pub fn from_elapsed(elapsed: Duration) -> Self {
        Self::from_total_hours(total_hours(elapsed))
    }

    pub fn message(&self) -> String {
        match self {
            FastingTier::BelowMinimum { hours_remaining } => format!(
                "Fasting: {hours_remaining} hours remaining to the {MINIMUM_HOURS}-hour minimum"
            ),
            FastingTier::MinimumReached { hours_to_ideal } => format!(
                "Minimum reached: {hours_to_ideal} hours to the {IDEAL_HOURS}-hour ideal"
            ),
            FastingTier::IdealReached => "Ideal reached: eating is OK".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_days_into_hours() {
        let elapsed =
            Duration::days(1) + Duration::hours(2) + Duration::minutes(5) + Duration::seconds(9);
        assert_eq!(format_elapsed(elapsed), "26:05:09");
        assert_eq!(total_hours(elapsed), 26);
    }

    #[test]
    fn formats_zero_and_negative_as_zero() {
        assert_eq!(format_elapsed(Duration::zero()), "00:00:00");
        assert_eq!(format_elapsed(Duration::seconds(-30)), "00:00:00");
        assert_eq!(total_hours(Duration::seconds(-30)), 0);
    }

    #[test]
    fn boundaries_belong_to_upper_tier() {
        assert_eq!(
            FastingTier::from_total_hours(11),
            FastingTier::BelowMinimum { hours_remaining: 1 }
        );
        assert_eq!(
            FastingTier::from_total_hours(12),
            FastingTier::MinimumReached { hours_to_ideal: 6 }
        );
        assert_eq!(
            FastingTier::from_total_hours(17),
            FastingTier::MinimumReached { hours_to_ideal: 1 }
        );
        assert_eq!(FastingTier::from_total_hours(18), FastingTier::IdealReached);
    }

    #[test]
    fn just_under_twelve_hours_is_still_below_minimum() {
        let tier = FastingTier::from_elapsed(Duration::hours(12) - Duration::seconds(1));
        assert_eq!(tier, FastingTier::BelowMinimum { hours_remaining: 1 });
    }

    #[test]
    fn messages_carry_the_hour_count() {
        assert_eq!(
            FastingTier::from_total_hours(12).message(),
            "Minimum reached: 6 hours to the 18-hour ideal"
        );
        assert_eq!(
            FastingTier::from_total_hours(0).message(),
            "Fasting: 12 hours remaining to the 12-hour minimum"
        );
        assert_eq!(FastingTier::from_total_hours(40).message(), "Ideal reached: eating is OK");
    }

    proptest! {
        #[test]
        fn exactly_one_tier_applies(hours in 0i64..10_000) {
            let tier = FastingTier::from_total_hours(hours);
            let below = matches!(tier, FastingTier::BelowMinimum { .. });
            let minimum = matches!(tier, FastingTier::MinimumReached { .. });
            let ideal = matches!(tier, FastingTier::IdealReached);
            prop_assert_eq!(below, hours < 12);
            prop_assert_eq!(minimum, (12..18).contains(&hours));
            prop_assert_eq!(ideal, hours >= 18);
        }

        #[test]
        fn remaining_hours_are_positive(hours in 0i64..18) {
            match FastingTier::from_total_hours(hours) {
                FastingTier::BelowMinimum { hours_remaining } => {
                    prop_assert!(hours_remaining > 0);
                    prop_assert_eq!(hours + hours_remaining, 12);
                }
                FastingTier::MinimumReached { hours_to_ideal } => {
                    prop_assert!(hours_to_ideal > 0);
                    prop_assert_eq!(hours + hours_to_ideal, 18);
                }
                FastingTier::IdealReached => prop_assert!(false, "18h not reached yet"),
            }
        }
    }
}
