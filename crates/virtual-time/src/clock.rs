//! Clock abstraction consumed by time-dependent code.

use crate::Instant;
use std::sync::Arc;
use std::time::Duration;

/// Current-time and delay provider.
///
/// Code written against this trait can be handed a [`crate::VirtualClock`] in tests and
/// have its delays released deterministically by the test driver.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration` as observed by this clock.
    fn sleep(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Shared, type-erased clock handle.
pub type SharedClock = Arc<dyn Clock>;
