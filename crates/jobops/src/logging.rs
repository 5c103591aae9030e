//! Logging initialization for binaries and test hosts.
//!
//! The library itself logs through the `log` facade; the subscriber
//! installed here bridges those records into `tracing` and renders
//! them with the fmt layer. Filtering follows `RUST_LOG`, defaulting
//! to `info`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer());
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::debug!("logging subsystem initialized");
}
