//! Per-fast threshold crossing record.
//!
//! ## State Transitions
//!
//! ```text
//! BelowMinimum -> MinimumFired -> IdealFired
//! ```
//!
//! A new meal resets to `BelowMinimum`; otherwise the record only moves
//! forward. A skipped poll that jumps straight past 18h fires both
//! thresholds in one `observe` call.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::tier::total_hours;

pub const MINIMUM_HOURS: i64 = 12;
pub const IDEAL_HOURS: i64 = 18;

/// Assumed fast length when no meal has ever been recorded.
pub const FALLBACK_FAST_HOURS: i64 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Threshold {
    Minimum,
    Ideal,
}

impl Threshold {
    pub const ALL: [Threshold; 2] = [Threshold::Minimum, Threshold::Ideal];

    pub fn hours(self) -> i64 {
        match self {
            Threshold::Minimum => MINIMUM_HOURS,
            Threshold::Ideal => IDEAL_HOURS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Threshold::Minimum => "minimum",
            Threshold::Ideal => "ideal",
        }
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FastPhase {
    BelowMinimum,
    MinimumFired,
    IdealFired,
}

/// Which thresholds already fired for the running fast. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdCrossings {
    phase: FastPhase,
}

impl ThresholdCrossings {
    pub fn new() -> Self {
        Self {
            phase: FastPhase::BelowMinimum,
        }
    }

    pub fn phase(&self) -> FastPhase {
        self.phase
    }

    pub fn has_fired(&self, threshold: Threshold) -> bool {
        match threshold {
            Threshold::Minimum => self.phase >= FastPhase::MinimumFired,
            Threshold::Ideal => self.phase >= FastPhase::IdealFired,
        }
    }

    /// Mark every threshold `elapsed` has reached and that has not fired yet.
    /// Returns the newly crossed thresholds in ascending order.
    pub fn observe(&mut self, elapsed: Duration) -> Vec<Threshold> {
        let hours = total_hours(elapsed);
        let mut crossed = Vec::new();
        for threshold in Threshold::ALL {
            if hours >= threshold.hours() && !self.has_fired(threshold) {
                crossed.push(threshold);
            }
        }
        if let Some(highest) = crossed.last() {
            self.phase = match highest {
                Threshold::Minimum => FastPhase::MinimumFired,
                Threshold::Ideal => FastPhase::IdealFired,
            };
        }
        crossed
    }

    /// Start over for a new fast.
    pub fn reset(&mut self) {
        self.phase = FastPhase::BelowMinimum;
    }
}

impl Default for ThresholdCrossings {
    fn default() -> Self {
        Self::new()
    }
}
