//! Fasting clock implementation.
//!
//! The clock owns the meal log and the per-fast crossing record behind one
//! lock. Elapsed time is never stored: every query recomputes it from the
//! caller's `now` and the last meal time, so sleeps and restarts cannot make
//! it drift.
//!
//! Other processes may append to the same log. Each query re-reads the most
//! recent meal first, and a meal the clock has not seen starts a new fast
//! exactly as [`FastingClock::record_meal`] would.
//!
//! ## Usage
//!
//! ```ignore
//! let clock = FastingClock::new(SqliteMealLog::open_default()?, Utc::now())?;
//! clock.current_elapsed(Utc::now());
//! clock.record_meal(Utc::now(), Some("oatmeal"))?;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use super::thresholds::{FastPhase, Threshold, ThresholdCrossings, FALLBACK_FAST_HOURS};
use super::tier::{format_elapsed, total_hours, FastingTier};
use crate::error::PersistenceError;
use crate::events::Event;
use crate::storage::{MealEvent, MealLog};

/// A threshold reached during a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crossing {
    pub threshold: Threshold,
    /// Start of the fast that crossed it (last meal, or the fallback point).
    pub fast_started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub at: DateTime<Utc>,
}

struct FastState {
    log: Box<dyn MealLog>,
    last_meal: Option<MealEvent>,
    crossings: ThresholdCrossings,
}

/// Elapsed-time clock for the running fast.
pub struct FastingClock {
    state: Mutex<FastState>,
    process_start: DateTime<Utc>,
}

impl FastingClock {
    /// Build the clock from the log's most recent meal.
    ///
    /// # Errors
    /// Returns the log's read error. An unreadable log is fatal at startup;
    /// an empty one is not.
    pub fn new(
        log: impl MealLog + 'static,
        process_start: DateTime<Utc>,
    ) -> Result<Self, PersistenceError> {
        let last_meal = log.most_recent()?;
        match &last_meal {
            Some(meal) => tracing::debug!(last_meal = %meal.timestamp, "resuming fast"),
            None => tracing::debug!(
                fallback_hours = FALLBACK_FAST_HOURS,
                "meal log empty, using fallback start"
            ),
        }
        Ok(Self {
            state: Mutex::new(FastState {
                log: Box::new(log),
                last_meal,
                crossings: ThresholdCrossings::new(),
            }),
            process_start,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn process_start(&self) -> DateTime<Utc> {
        self.process_start
    }

    pub fn last_meal(&self) -> Option<MealEvent> {
        self.synced().last_meal.clone()
    }

    /// Start of the current fast: last meal, or 18h before process start.
    pub fn last_meal_time(&self) -> DateTime<Utc> {
        self.fast_start(&self.synced())
    }

    pub fn current_elapsed(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.last_meal_time(), now)
    }

    pub fn phase(&self) -> FastPhase {
        self.synced().crossings.phase()
    }

    /// Up to `n` meals, most recent first.
    pub fn recent(&self, n: usize) -> Result<Vec<MealEvent>, PersistenceError> {
        self.lock().log.recent(n)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        let state = self.synced();
        let started = self.fast_start(&state);
        let elapsed = elapsed_between(started, now);
        let tier = FastingTier::from_elapsed(elapsed);
        Event::StateSnapshot {
            last_meal_at: started,
            fallback: state.last_meal.is_none(),
            elapsed_secs: elapsed.num_seconds(),
            clock: format_elapsed(elapsed),
            total_hours: total_hours(elapsed),
            message: tier.message(),
            tier,
            phase: state.crossings.phase(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Record a meal at `now` and start a new fast.
    ///
    /// The append and the crossing reset happen under the same lock the
    /// notifier polls with. If the append fails nothing changes.
    pub fn record_meal(
        &self,
        now: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<MealEvent, PersistenceError> {
        let mut state = self.lock();
        let meal = state.log.append(now, note.unwrap_or(""))?;
        state.last_meal = Some(meal.clone());
        state.crossings.reset();
        tracing::info!(meal_id = meal.id, at = %meal.timestamp, "meal recorded, new fast started");
        Ok(meal)
    }

    /// Mark and return every threshold the running fast has newly reached.
    pub fn poll(&self, now: DateTime<Utc>) -> Vec<Crossing> {
        let mut state = self.synced();
        let started = self.fast_start(&state);
        let elapsed = elapsed_between(started, now);
        state
            .crossings
            .observe(elapsed)
            .into_iter()
            .map(|threshold| Crossing {
                threshold,
                fast_started_at: started,
                elapsed,
                at: now,
            })
            .collect()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fast_start(&self, state: &FastState) -> DateTime<Utc> {
        state
            .last_meal
            .as_ref()
            .map(|meal| meal.timestamp)
            .unwrap_or_else(|| self.process_start - Duration::hours(FALLBACK_FAST_HOURS))
    }

    /// Lock and pick up any meal appended to the log behind our back.
    ///
    /// A read error keeps the cached state; the next query retries.
    fn synced(&self) -> MutexGuard<'_, FastState> {
        let mut state = self.lock();
        match state.log.most_recent() {
            Ok(latest) if latest != state.last_meal => {
                if let Some(meal) = &latest {
                    tracing::info!(
                        meal_id = meal.id,
                        at = %meal.timestamp,
                        "meal found in log, new fast started"
                    );
                }
                state.last_meal = latest;
                state.crossings.reset();
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("could not re-read meal log: {e}"),
        }
        state
    }

    // Every mutation completes before the guard drops, so a poisoned
    // state is still consistent.
    fn lock(&self) -> MutexGuard<'_, FastState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - start).max(Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteMealLog;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn empty_clock(start: DateTime<Utc>) -> FastingClock {
        FastingClock::new(SqliteMealLog::open_in_memory().unwrap(), start).unwrap()
    }

    struct BrokenLog;

    impl MealLog for BrokenLog {
        fn append(&mut self, _: DateTime<Utc>, _: &str) -> Result<MealEvent, PersistenceError> {
            Err(PersistenceError::WriteFailed("disk full".into()))
        }
        fn most_recent(&self) -> Result<Option<MealEvent>, PersistenceError> {
            Ok(None)
        }
        fn recent(&self, _: usize) -> Result<Vec<MealEvent>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    /// Reads succeed until `fail` is set.
    struct FlakyLog {
        meal: MealEvent,
        fail: std::sync::Arc<AtomicBool>,
    }

    impl MealLog for FlakyLog {
        fn append(&mut self, _: DateTime<Utc>, _: &str) -> Result<MealEvent, PersistenceError> {
            Err(PersistenceError::Locked)
        }
        fn most_recent(&self) -> Result<Option<MealEvent>, PersistenceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PersistenceError::Unreadable("gone".into()));
            }
            Ok(Some(self.meal.clone()))
        }
        fn recent(&self, _: usize) -> Result<Vec<MealEvent>, PersistenceError> {
            Ok(vec![self.meal.clone()])
        }
    }

    #[test]
    fn read_error_after_startup_keeps_cached_fast() {
        let fail = std::sync::Arc::new(AtomicBool::new(false));
        let meal = MealEvent {
            id: 1,
            timestamp: t(0),
            note: String::new(),
        };
        let log = FlakyLog {
            meal,
            fail: std::sync::Arc::clone(&fail),
        };
        let clock = FastingClock::new(log, t(0)).unwrap();
        assert_eq!(clock.poll(t(13)).len(), 1);

        fail.store(true, Ordering::SeqCst);
        assert_eq!(clock.current_elapsed(t(14)), Duration::hours(14));
        assert_eq!(clock.phase(), FastPhase::MinimumFired);
        assert!(clock.poll(t(15)).is_empty());
    }

    #[test]
    fn empty_log_starts_eighteen_hours_in() {
        let clock = empty_clock(t(8));
        assert_eq!(clock.current_elapsed(t(8)), Duration::hours(18));
        assert_eq!(clock.current_elapsed(t(9)), Duration::hours(19));
        assert!(clock.last_meal().is_none());
    }

    #[test]
    fn record_meal_resets_elapsed() {
        let clock = empty_clock(t(0));
        let meal = clock.record_meal(t(8), Some(" eggs ")).unwrap();
        assert_eq!(meal.note, " eggs ");
        assert_eq!(clock.last_meal_time(), t(8));
        assert_eq!(clock.current_elapsed(t(8)), Duration::zero());
    }

    #[test]
    fn elapsed_never_goes_negative() {
        let clock = empty_clock(t(0));
        clock.record_meal(t(8), None).unwrap();
        assert_eq!(clock.current_elapsed(t(7)), Duration::zero());
    }

    #[test]
    fn failed_append_leaves_state_untouched() {
        let clock = FastingClock::new(BrokenLog, t(20)).unwrap();
        assert_eq!(clock.poll(t(20)).len(), 2);

        let err = clock.record_meal(t(21), None).unwrap_err();
        assert!(matches!(err, PersistenceError::WriteFailed(_)));
        assert_eq!(clock.phase(), FastPhase::IdealFired);
        assert_eq!(clock.last_meal_time(), t(2));
    }

    #[test]
    fn poll_fires_each_threshold_once_per_fast() {
        let clock = empty_clock(t(0));
        clock.record_meal(t(0), None).unwrap();

        assert!(clock.poll(t(5)).is_empty());
        let crossed: Vec<_> = clock.poll(t(20)).into_iter().map(|c| c.threshold).collect();
        assert_eq!(crossed, vec![Threshold::Minimum, Threshold::Ideal]);
        assert!(clock.poll(t(21)).is_empty());

        clock.record_meal(t(22), None).unwrap();
        assert_eq!(clock.phase(), FastPhase::BelowMinimum);
    }

    #[test]
    fn crossing_reports_fast_start() {
        let clock = empty_clock(t(0));
        clock.record_meal(t(1), None).unwrap();
        let crossing = &clock.poll(t(13))[0];
        assert_eq!(crossing.fast_started_at, t(1));
        assert_eq!(crossing.elapsed, Duration::hours(12));
        assert_eq!(crossing.at, t(13));
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let clock = empty_clock(t(0));
        clock.record_meal(t(8), None).unwrap();
        match clock.snapshot(t(20)) {
            Event::StateSnapshot {
                fallback,
                elapsed_secs,
                clock,
                total_hours,
                tier,
                ..
            } => {
                assert!(!fallback);
                assert_eq!(elapsed_secs, 12 * 3600);
                assert_eq!(clock, "12:00:00");
                assert_eq!(total_hours, 12);
                assert_eq!(tier, FastingTier::MinimumReached { hours_to_ideal: 6 });
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
