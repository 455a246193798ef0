mod notifier;
mod sink;

pub use notifier::{NotifierHandle, ThresholdNotifier, DEFAULT_POLL_INTERVAL};
pub use sink::{
    sinks_from_config, BellSink, CommandSink, ConsoleSink, NotificationSink, ThresholdNotice,
    TracingSink,
};
