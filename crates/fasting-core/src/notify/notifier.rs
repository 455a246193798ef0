//! Background threshold notifier.
//!
//! Polls the [`FastingClock`] on a fixed cadence and hands every newly
//! crossed threshold to each configured channel. Correctness does not depend
//! on the cadence: a poll that lands long after a boundary still fires it,
//! and a threshold never fires twice within one fast.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::sink::{NotificationSink, ThresholdNotice};
use crate::clock::FastingClock;
use crate::events::Event;

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub struct ThresholdNotifier {
    clock: Arc<FastingClock>,
    sinks: Vec<Box<dyn NotificationSink>>,
    poll_interval: Duration,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl ThresholdNotifier {
    pub fn new(clock: Arc<FastingClock>, poll_interval: Duration) -> Self {
        Self {
            clock,
            sinks: Vec::new(),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            events: None,
        }
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn with_sinks(mut self, sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// Also publish lifecycle and crossing events on `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// One poll. Returns a `ThresholdCrossed` event per newly crossed threshold.
    ///
    /// The crossing is marked before any channel runs, so a failing channel
    /// cannot cause a repeat on the next tick.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<Event> {
        let crossings = self.clock.poll(now);
        tracing::debug!(crossed = crossings.len(), "notifier tick");

        let mut fired = Vec::with_capacity(crossings.len());
        for crossing in crossings {
            let notice = ThresholdNotice::from(crossing);
            self.deliver(&notice);
            let event = Event::ThresholdCrossed {
                threshold: notice.threshold,
                fast_started_at: notice.fast_started_at,
                elapsed_secs: notice.elapsed.num_seconds(),
                at: notice.at,
            };
            self.publish(&event);
            fired.push(event);
        }
        fired
    }

    fn deliver(&self, notice: &ThresholdNotice) {
        for sink in &self.sinks {
            if let Err(e) = sink.notify(notice) {
                tracing::warn!(
                    channel = sink.name(),
                    threshold = %notice.threshold,
                    "notification failed: {e}"
                );
            }
        }
    }

    fn publish(&self, event: &Event) {
        if let Some(tx) = &self.events {
            // Receiver gone just means nobody is listening any more.
            let _ = tx.send(event.clone());
        }
    }

    /// Run the poll loop on the current tokio runtime.
    ///
    /// The first poll happens immediately, so thresholds already passed at
    /// startup are announced without waiting a full interval.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn(self) -> NotifierHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        NotifierHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "threshold notifier started"
        );
        self.publish(&Event::NotifierStarted {
            poll_interval_secs: self.poll_interval.as_secs(),
            at: Utc::now(),
        });

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick(Utc::now());
                }
            }
        }

        tracing::info!("threshold notifier stopped");
        self.publish(&Event::NotifierStopped { at: Utc::now() });
    }
}

/// Owner of a running notifier loop. Dropping it also stops the loop.
pub struct NotifierHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl NotifierHandle {
    /// Cancel the wait between polls and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("notifier task ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
