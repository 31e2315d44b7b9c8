//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want to see them call [`init_tracing`] once.

use super::config::TelemetryConfig;

/// Install a global subscriber filtered by `RUST_LOG`, falling back to the
/// configured level.
///
/// Returns false when a global subscriber was already installed.
#[cfg(feature = "telemetry")]
pub fn init_tracing(config: &TelemetryConfig) -> bool {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_config: &TelemetryConfig) -> bool {
    false
}
