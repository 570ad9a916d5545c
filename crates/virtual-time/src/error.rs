use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the fallible helpers around the virtual clock.
///
/// Core clock operations never fail; these cover bounded test orchestration and
/// configuration loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// `wait_for_pending_timeout` gave up before enough waiters registered.
    #[error("timed out after {waited:?} waiting for {expected} pending waiters (observed {observed})")]
    PendingTimeout {
        /// Number of pending waiters the caller asked for.
        expected: usize,
        /// Pending count at the moment the wait gave up.
        observed: usize,
        /// Real time spent polling.
        waited: Duration,
    },
    /// Malformed configuration value.
    #[error("config {key}={value:?}: {reason}")]
    Config {
        /// Environment key that failed to parse.
        key: &'static str,
        /// Raw value as read.
        value: String,
        /// Parser message.
        reason: String,
    },
}
