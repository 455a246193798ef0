//! Tracing setup for the CLI.
//!
//! Logs go to stderr so JSON on stdout stays machine-readable. The filter
//! comes from `FASTING_LOG`, then `RUST_LOG`, then defaults to `warn`.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_env("FASTING_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
