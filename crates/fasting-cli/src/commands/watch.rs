//! Live clock plus background threshold notifications.
//!
//! The refresh loop only reads the clock; the notifier task owns the
//! crossing checks. Both share one `FastingClock`.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use fasting_core::notify::sinks_from_config;
use fasting_core::{Config, Event, FastingClock, ThresholdNotifier};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{open_clock, CommandResult};

pub fn run(db: Option<&Path>, cfg: &Config, json: bool) -> CommandResult {
    let clock = Arc::new(open_clock(db, cfg)?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(clock, cfg, json))
}

async fn watch(clock: Arc<FastingClock>, cfg: &Config, json: bool) -> CommandResult {
    let (tx, mut events) = mpsc::unbounded_channel();
    let handle = ThresholdNotifier::new(Arc::clone(&clock), cfg.poll_interval())
        .with_sinks(sinks_from_config(&cfg.notifications))
        .with_events(tx)
        .spawn();

    let mut refresh = tokio::time::interval(cfg.refresh_interval());
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome: CommandResult = loop {
        tokio::select! {
            signal = &mut ctrl_c => break signal.map_err(Into::into),
            _ = refresh.tick(), if !json => {
                if let Err(e) = render(&clock) {
                    break Err(e.into());
                }
            }
            Some(event) = events.recv() => {
                if json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => tracing::warn!("could not encode event: {e}"),
                    }
                }
            }
        }
    };

    handle.shutdown().await;
    if !json {
        println!();
    }
    outcome
}

fn render(clock: &FastingClock) -> std::io::Result<()> {
    let Event::StateSnapshot { clock: hms, message, .. } = clock.snapshot(Utc::now()) else {
        return Ok(());
    };
    let mut out = std::io::stdout().lock();
    write!(out, "\r{hms}  {message}\x1b[K")?;
    out.flush()
}
