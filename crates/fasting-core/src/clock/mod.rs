mod engine;
mod thresholds;
mod tier;

pub use engine::{Crossing, FastingClock};
pub use thresholds::{
    FastPhase, Threshold, ThresholdCrossings, FALLBACK_FAST_HOURS, IDEAL_HOURS, MINIMUM_HOURS,
};
pub use tier::{format_elapsed, total_hours, FastingTier};
