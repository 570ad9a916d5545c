//! Opaque virtual instants measured from a clock's origin.

use std::fmt;
use std::time::Duration;

/// A point on a virtual timeline.
///
/// Instants are only meaningful relative to the [`crate::VirtualClock`] that produced
/// them; they carry no relationship to wall-clock or monotonic system time.
/// Arithmetic saturates at the largest representable instant instead of panicking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(Duration);

impl Instant {
    /// The origin of every virtual timeline.
    pub const ORIGIN: Self = Self(Duration::ZERO);

    /// Largest representable instant; saturating arithmetic clamps here.
    pub const MAX: Self = Self(Duration::MAX);

    /// Instant located `offset` after the origin.
    pub const fn from_origin(offset: Duration) -> Self {
        Self(offset)
    }

    /// Time elapsed between the origin and this instant.
    pub const fn elapsed_since_origin(self) -> Duration {
        self.0
    }

    /// `self + d`, or `None` on overflow.
    pub fn checked_add(self, d: Duration) -> Option<Self> {
        self.0.checked_add(d).map(Self)
    }

    /// `self + d`, clamped to [`Instant::MAX`].
    pub fn saturating_add(self, d: Duration) -> Self {
        Self(self.0.saturating_add(d))
    }

    /// Distance from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T+{:?}", self.0)
    }
}
