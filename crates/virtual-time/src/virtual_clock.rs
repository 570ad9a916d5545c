//! The virtual clock and its sleep coordinator.

use crate::stats::Counters;
use crate::{Clock, ClockStats, Error, Instant, VirtualClockConfig};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant as WallInstant};
use tokio::sync::oneshot;
use tracing::{debug, info_span, trace, warn};

/// One registered sleep, parked until an advance reaches `due`.
struct WaitRequest {
    seq: u64,
    due: Instant,
    release: oneshot::Sender<()>,
    done: oneshot::Receiver<()>,
}

/// Waiter side of a registration.
struct Ticket {
    seq: u64,
    release: oneshot::Receiver<()>,
    done: oneshot::Sender<()>,
}

struct State {
    now: Instant,
    next_seq: u64,
    pending: Vec<WaitRequest>,
}

impl State {
    /// Remove every request due at or before `now`, earliest due first, ties in
    /// registration order.
    fn drain_ready(&mut self) -> Vec<WaitRequest> {
        let now = self.now;
        let (mut ready, remaining): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|r| r.due <= now);
        self.pending = remaining;
        ready.sort_by_key(|r| (r.due, r.seq));
        ready
    }

    fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|r| r.due).min()
    }
}

struct Shared {
    state: Mutex<State>,
    poll_interval: Duration,
    yield_after_release: bool,
    counters: Counters,
}

/// Test-controlled clock that parks sleepers until the driver advances time.
///
/// Cloning is cheap and every clone shares the same timeline and pending set, so a
/// clone can be handed to each worker thread while the test keeps one to drive time.
/// Separately constructed clocks are fully independent.
///
/// Every advance releases its ready waiters one at a time and waits for each to
/// resume before releasing the next. When `advance` or `advance_to_next_event`
/// returns, every waiter it released has woken and is on its way out of `sleep`.
///
/// The blocking operations (`sleep`, `advance`, `advance_to_next_event`) must not be
/// called from inside an async task; use [`VirtualClock::sleep_async`] for tasks, and
/// drive the clock from a plain thread or `tokio::task::spawn_blocking`.
#[derive(Clone)]
pub struct VirtualClock {
    shared: Arc<Shared>,
}

impl VirtualClock {
    /// New clock at [`Instant::ORIGIN`] with default settings.
    pub fn new() -> Self {
        Self::with_config(VirtualClockConfig::default())
    }

    /// New clock starting at `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self::build(start, &VirtualClockConfig::default())
    }

    /// New clock configured from `cfg`.
    pub fn with_config(cfg: VirtualClockConfig) -> Self {
        Self::build(Instant::from_origin(cfg.start_offset()), &cfg)
    }

    fn build(start: Instant, cfg: &VirtualClockConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State { now: start, next_seq: 0, pending: Vec::new() }),
                poll_interval: cfg.poll_interval(),
                yield_after_release: cfg.yield_after_release,
                counters: Counters::default(),
            }),
        }
    }

    // Critical sections never panic, so a poisoned lock still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual instant.
    pub fn now(&self) -> Instant {
        self.lock().now
    }

    /// Number of registered waits not yet released.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Earliest due instant among pending waits.
    pub fn next_due(&self) -> Option<Instant> {
        self.lock().next_due()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> ClockStats {
        self.shared.counters.snapshot()
    }

    fn register(&self, duration: Duration) -> Ticket {
        let (release_tx, release_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now.saturating_add(duration);
        trace!(
            seq,
            due_ns = nanos(due.elapsed_since_origin()),
            now_ns = nanos(state.now.elapsed_since_origin()),
            "sleep registered"
        );
        state.pending.push(WaitRequest { seq, due, release: release_tx, done: done_rx });
        drop(state);
        self.shared.counters.record_registered();
        Ticket { seq, release: release_rx, done: done_tx }
    }

    /// Park the calling thread until an advance moves the clock to `now + duration`.
    ///
    /// The wait is in the pending set before this call can block. Zero durations are
    /// not short-circuited: they still need an advance (of any amount) to return.
    /// `duration` is a [`Duration`], so negative waits are unrepresentable; a due
    /// instant past [`Instant::MAX`] is clamped to it.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn sleep(&self, duration: Duration) {
        let Ticket { seq, release, done } = self.register(duration);
        if release.blocking_recv().is_err() {
            warn!(seq, "sleep abandoned without release");
            return;
        }
        let _ = done.send(());
        if self.shared.yield_after_release {
            std::thread::yield_now();
        }
    }

    /// Async counterpart of [`VirtualClock::sleep`] for waiters running as tasks.
    ///
    /// Registration happens on the first poll. Dropping the future before release
    /// leaves its request pending; the advance that reaches it skips it.
    pub async fn sleep_async(&self, duration: Duration) {
        let Ticket { seq, release, done } = self.register(duration);
        if release.await.is_err() {
            warn!(seq, "sleep abandoned without release");
            return;
        }
        let _ = done.send(());
        if self.shared.yield_after_release {
            tokio::task::yield_now().await;
        }
    }

    /// Block until at least `count` waits are pending.
    pub fn wait_for_pending(&self, count: usize) {
        while self.pending_count() < count {
            self.pause();
        }
    }

    /// Like [`VirtualClock::wait_for_pending`], but give up after `limit` of real time.
    pub fn wait_for_pending_timeout(&self, count: usize, limit: Duration) -> Result<(), Error> {
        let started = WallInstant::now();
        loop {
            let observed = self.pending_count();
            if observed >= count {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= limit {
                return Err(Error::PendingTimeout { expected: count, observed, waited });
            }
            self.pause();
        }
    }

    fn pause(&self) {
        if self.shared.poll_interval.is_zero() {
            std::thread::yield_now();
        } else {
            std::thread::sleep(self.shared.poll_interval);
        }
    }

    /// Move the clock forward by `delta` and release every wait now due.
    ///
    /// Returns once each released waiter has resumed.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context while a waiter is
    /// due.
    pub fn advance(&self, delta: Duration) {
        let span = info_span!("virtual_clock.advance", delta_ns = nanos(delta));
        let _entered = span.enter();
        let (now, ready) = {
            let mut state = self.lock();
            state.now = state.now.saturating_add(delta);
            (state.now, state.drain_ready())
        };
        if !delta.is_zero() || !ready.is_empty() {
            self.shared.counters.record_advance();
        }
        debug!(now_ns = nanos(now.elapsed_since_origin()), ready = ready.len(), "clock advanced");
        self.hand_off(ready);
    }

    /// Jump to the earliest pending due instant and release every wait due there.
    ///
    /// Returns the distance jumped, or [`Duration::ZERO`] without touching the clock
    /// when nothing is pending. Waits tied at the earliest instant are all released by
    /// this one call.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context while a waiter is
    /// pending.
    pub fn advance_to_next_event(&self) -> Duration {
        let span = info_span!("virtual_clock.advance_to_next_event");
        let _entered = span.enter();
        let (delta, now, ready) = {
            let mut state = self.lock();
            let Some(min_due) = state.next_due() else {
                trace!("no pending waits");
                return Duration::ZERO;
            };
            // Bump and drain share one critical section, so no pending due lags the clock.
            debug_assert!(min_due >= state.now);
            let delta = min_due.saturating_duration_since(state.now);
            state.now = min_due;
            (delta, state.now, state.drain_ready())
        };
        if !delta.is_zero() || !ready.is_empty() {
            self.shared.counters.record_advance();
        }
        debug!(
            delta_ns = nanos(delta),
            now_ns = nanos(now.elapsed_since_origin()),
            ready = ready.len(),
            "clock advanced to next event"
        );
        self.hand_off(ready);
        delta
    }

    /// Release `ready` one waiter at a time, each acknowledged before the next.
    fn hand_off(&self, ready: Vec<WaitRequest>) {
        for WaitRequest { seq, due, release, done } in ready {
            let due_ns = nanos(due.elapsed_since_origin());
            if release.send(()).is_err() {
                warn!(seq, due_ns, "waiter gone before release");
                continue;
            }
            self.shared.counters.record_released();
            if done.blocking_recv().is_err() {
                warn!(seq, due_ns, "waiter gone before completion");
                continue;
            }
            debug!(seq, due_ns, "waiter released");
        }
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("pending", &state.pending.len())
            .finish_non_exhaustive()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        Self::now(self)
    }

    fn sleep(&self, duration: Duration) {
        Self::sleep(self, duration);
    }
}

fn nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
