use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use chrono::{DateTime, Duration, Local, Utc};

use crate::clock::{format_elapsed, Crossing, Threshold};
use crate::error::NotifyError;
use crate::storage::NotificationsConfig;

/// What a channel is asked to show when a threshold is crossed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdNotice {
    pub threshold: Threshold,
    pub fast_started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub at: DateTime<Utc>,
}

impl ThresholdNotice {
    pub fn title(&self) -> &'static str {
        match self.threshold {
            Threshold::Minimum => "12 hours reached",
            Threshold::Ideal => "18 hours reached",
        }
    }

    pub fn body(&self) -> &'static str {
        match self.threshold {
            Threshold::Minimum => "You reached the 12-hour minimum fast!",
            Threshold::Ideal => "You reached the ideal 18-hour fast! It's fine to eat now.",
        }
    }
}

impl From<Crossing> for ThresholdNotice {
    fn from(crossing: Crossing) -> Self {
        Self {
            threshold: crossing.threshold,
            fast_started_at: crossing.fast_started_at,
            elapsed: crossing.elapsed,
            at: crossing.at,
        }
    }
}

/// A notification channel. Delivery is best-effort and fire-and-forget:
/// an error is logged by the notifier and never retried.
pub trait NotificationSink: Send + Sync {
    /// Short identifier used in logs (e.g. "console", "bell").
    fn name(&self) -> &str;

    fn notify(&self, notice: &ThresholdNotice) -> Result<(), NotifyError>;
}

/// Writes every notice to the tracing log. Always installed.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, notice: &ThresholdNotice) -> Result<(), NotifyError> {
        tracing::info!(
            threshold = %notice.threshold,
            elapsed = %format_elapsed(notice.elapsed),
            "{}",
            notice.body()
        );
        Ok(())
    }
}

/// Prints the notice on its own terminal line.
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    fn notify(&self, notice: &ThresholdNotice) -> Result<(), NotifyError> {
        let local = notice.at.with_timezone(&Local).format("%H:%M");
        let mut out = std::io::stdout().lock();
        writeln!(out, "\n[{local}] {}: {}", notice.title(), notice.body())
            .and_then(|()| out.flush())
            .map_err(|e| channel_failed(self.name(), e))
    }
}

/// Terminal bell, or a sound file played through an external player.
pub struct BellSink {
    sound_file: Option<PathBuf>,
    player: Option<String>,
}

impl BellSink {
    pub fn new(sound_file: Option<PathBuf>, player: Option<String>) -> Self {
        Self { sound_file, player }
    }

    fn ring(&self) -> Result<(), NotifyError> {
        let mut err = std::io::stderr().lock();
        err.write_all(b"\x07")
            .and_then(|()| err.flush())
            .map_err(|e| channel_failed(self.name(), e))
    }
}

impl NotificationSink for BellSink {
    fn name(&self) -> &str {
        "bell"
    }

    fn notify(&self, _notice: &ThresholdNotice) -> Result<(), NotifyError> {
        let Some(sound) = &self.sound_file else {
            return self.ring();
        };
        if !sound.exists() {
            return Err(NotifyError::AssetMissing(sound.clone()));
        }
        match &self.player {
            Some(player) => spawn_detached(player, &[sound.to_string_lossy().into_owned()])
                .map(drop)
                .map_err(|e| channel_failed(self.name(), e)),
            None => self.ring(),
        }
    }
}

/// Runs an external command with the title and body as the last two
/// arguments, e.g. `notify-send "18 hours reached" "..."`.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Split a command line on whitespace. `None` for a blank line.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl NotificationSink for CommandSink {
    fn name(&self) -> &str {
        "command"
    }

    fn notify(&self, notice: &ThresholdNotice) -> Result<(), NotifyError> {
        let mut args = self.args.clone();
        args.push(notice.title().to_string());
        args.push(notice.body().to_string());
        spawn_detached(&self.program, &args)
            .map(drop)
            .map_err(|e| channel_failed(self.name(), e))
    }
}

/// Channels described by the `[notifications]` section.
///
/// The tracing sink is always present so a crossing leaves a trace even when
/// every user-facing channel is disabled or failing.
pub fn sinks_from_config(config: &NotificationsConfig) -> Vec<Box<dyn NotificationSink>> {
    let mut sinks: Vec<Box<dyn NotificationSink>> = vec![Box::new(TracingSink)];
    if !config.enabled {
        return sinks;
    }
    if config.console {
        sinks.push(Box::new(ConsoleSink));
    }
    if config.bell {
        let sound_file = non_blank(&config.sound_file).map(PathBuf::from);
        let player = non_blank(&config.sound_player).map(str::to_string);
        sinks.push(Box::new(BellSink::new(sound_file, player)));
    }
    if let Some(command) = non_blank(&config.command).and_then(CommandSink::parse) {
        sinks.push(Box::new(command));
    }
    sinks
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Start `program` without blocking the caller. A waiter thread reaps the
/// child so long-running watches do not collect zombies.
fn spawn_detached(
    program: &str,
    args: &[String],
) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    let program = program.to_string();
    Ok(std::thread::spawn(move || {
        let status = child.wait();
        if let Err(e) = &status {
            tracing::warn!(program = %program, "waiting on notification process failed: {e}");
        }
        status
    }))
}

fn channel_failed(channel: &str, err: std::io::Error) -> NotifyError {
    NotifyError::ChannelFailed {
        channel: channel.to_string(),
        message: err.to_string(),
    }
}
