//! Deterministic virtual time for testing time-dependent concurrent code.
//!
//! A [`VirtualClock`] holds a test-controlled instant plus the set of threads parked in
//! [`VirtualClock::sleep`]. The test driver moves time forward with
//! [`VirtualClock::advance`] or [`VirtualClock::advance_to_next_event`]; each call wakes
//! exactly the sleepers whose due instant has been reached, one at a time, and returns
//! only after every one of them has resumed.
//!
//! ```
//! use std::time::Duration;
//! use virtual_time::VirtualClock;
//!
//! let clock = VirtualClock::new();
//! let worker = {
//!     let clock = clock.clone();
//!     std::thread::spawn(move || {
//!         clock.sleep(Duration::from_millis(500));
//!         clock.now()
//!     })
//! };
//!
//! clock.wait_for_pending(1);
//! assert_eq!(clock.advance_to_next_event(), Duration::from_millis(500));
//! let woke_at = worker.join().unwrap();
//! assert_eq!(woke_at.elapsed_since_origin(), Duration::from_millis(500));
//! ```
//!
//! The driver blocks while waiters hand off, so inside a Tokio runtime (for example a
//! `#[tokio::test]`) run the `advance*` calls under `tokio::task::spawn_blocking` and
//! park tasks with [`VirtualClock::sleep_async`].

#![deny(unsafe_code)]

pub mod clock;
pub mod config;
mod error;
pub mod instant;
mod stats;
mod virtual_clock;

pub use clock::{Clock, SharedClock};
pub use config::VirtualClockConfig;
pub use error::Error;
pub use instant::Instant;
pub use stats::ClockStats;
pub use virtual_clock::VirtualClock;
