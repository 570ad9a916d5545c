use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a clock's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockStats {
    /// Waits ever registered.
    pub registered: u64,
    /// Waits handed off to their waiter.
    pub released: u64,
    /// Advance calls that moved the clock or released at least one waiter.
    pub advances: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    registered: AtomicU64,
    released: AtomicU64,
    advances: AtomicU64,
}

impl Counters {
    pub(crate) fn record_registered(&self) {
        let _ = self.registered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_released(&self) {
        let _ = self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_advance(&self) {
        let _ = self.advances.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ClockStats {
        ClockStats {
            registered: self.registered.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            advances: self.advances.load(Ordering::Relaxed),
        }
    }
}
