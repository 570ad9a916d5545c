//! Structured logging bootstrap.
//!
//! Filtering follows `RUST_LOG` (e.g. `"info,virtual_time=trace"`) and falls back to
//! [`DEFAULT_FILTER`].

#![deny(unsafe_code)]

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Errors raised while installing a subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber could not be installed (usually: one already is).
    #[error("subscriber init failed: {0}")]
    Init(String),
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a JSON subscriber (with span context) as the global default.
pub fn try_init_json_logging() -> Result<(), TelemetryError> {
    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let subscriber = Registry::default().with(env_filter()).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| TelemetryError::Init(e.to_string()))
}

/// Initialize structured logging (JSON) with env filter. Idempotent.
pub fn init_json_logging() {
    try_init_json_logging().ok();
}

/// Compact human-readable output routed through the libtest capture. Idempotent.
pub fn init_test_logging() {
    let _ = fmt().with_env_filter(env_filter()).with_test_writer().compact().try_init();
}
