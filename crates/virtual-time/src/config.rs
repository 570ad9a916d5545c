//! Virtual clock configuration.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Env var for the initial instant, in milliseconds since origin.
pub const ENV_START_MS: &str = "VTIME_START_MS";
/// Env var for the pending-count polling period, in milliseconds.
pub const ENV_POLL_INTERVAL_MS: &str = "VTIME_POLL_INTERVAL_MS";
/// Env var toggling the cooperative yield after a waiter is released.
pub const ENV_YIELD_AFTER_RELEASE: &str = "VTIME_YIELD_AFTER_RELEASE";

/// Tunables for a [`crate::VirtualClock`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualClockConfig {
    /// Initial virtual instant, in milliseconds since origin.
    pub start_ms: u64,
    /// Real-time period between pending-count polls. Zero yields between polls instead.
    pub poll_interval_ms: u64,
    /// Yield to the scheduler after a released waiter signals completion.
    pub yield_after_release: bool,
}

impl Default for VirtualClockConfig {
    fn default() -> Self {
        Self { start_ms: 0, poll_interval_ms: 1, yield_after_release: true }
    }
}

impl VirtualClockConfig {
    /// Defaults overridden by any `VTIME_*` variables present in the environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`VirtualClockConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_START_MS) {
            cfg.start_ms = parse(ENV_START_MS, v)?;
        }
        if let Some(v) = lookup(ENV_POLL_INTERVAL_MS) {
            cfg.poll_interval_ms = parse(ENV_POLL_INTERVAL_MS, v)?;
        }
        if let Some(v) = lookup(ENV_YIELD_AFTER_RELEASE) {
            cfg.yield_after_release = parse(ENV_YIELD_AFTER_RELEASE, v)?;
        }
        Ok(cfg)
    }

    pub(crate) fn start_offset(&self) -> Duration {
        Duration::from_millis(self.start_ms)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse<T>(key: &'static str, value: String) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let parsed = value.trim().parse::<T>();
    parsed.map_err(|e| Error::Config { key, reason: e.to_string(), value })
}
