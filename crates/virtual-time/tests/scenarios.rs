// End-to-end sleep/advance scenarios with real worker threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use virtual_time::{Error, Instant, VirtualClock};

const RECV_LIMIT: Duration = Duration::from_secs(5);

fn ns(n: u64) -> Duration {
    Duration::from_nanos(n)
}

fn at(n: u64) -> Instant {
    Instant::from_origin(ns(n))
}

/// Spawn a worker that sleeps for `d`, then reports `name` on `tx`.
fn sleeper(
    clock: &VirtualClock,
    name: &'static str,
    d: Duration,
    tx: &mpsc::Sender<&'static str>,
) -> JoinHandle<()> {
    let clock = clock.clone();
    let tx = tx.clone();
    thread::spawn(move || {
        clock.sleep(d);
        tx.send(name).unwrap();
    })
}

#[test]
fn three_waiters_released_one_event_at_a_time() {
    telemetry::init_test_logging();
    let clock = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let handles = vec![
        sleeper(&clock, "A", ns(500), &tx),
        sleeper(&clock, "B", ns(200), &tx),
        sleeper(&clock, "C", ns(800), &tx),
    ];
    clock.wait_for_pending(3);

    let expected = [("B", 200, 200, 2), ("A", 300, 500, 1), ("C", 300, 800, 0)];
    for (name, delta, now, left) in expected {
        assert_eq!(clock.advance_to_next_event(), ns(delta));
        assert_eq!(clock.now(), at(now));
        assert_eq!(clock.pending_count(), left);
        assert_eq!(rx.recv_timeout(RECV_LIMIT).unwrap(), name);
    }

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(clock.advance_to_next_event(), Duration::ZERO);
    assert_eq!(clock.now(), at(800));
}

#[test]
fn fixed_advance_past_due_releases_waiter() {
    let clock = VirtualClock::new();
    let completed = Arc::new(AtomicBool::new(false));
    let handle = {
        let clock = clock.clone();
        let completed = completed.clone();
        thread::spawn(move || {
            clock.sleep(ns(100));
            completed.store(true, Ordering::SeqCst);
        })
    };
    clock.wait_for_pending(1);

    clock.advance(ns(150));
    assert_eq!(clock.pending_count(), 0);
    handle.join().unwrap();
    assert!(completed.load(Ordering::SeqCst));
    assert_eq!(clock.now(), at(150));
}

#[test]
fn partial_advance_then_next_event() {
    telemetry::init_test_logging();
    let clock = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let first = sleeper(&clock, "first", ns(100), &tx);
    let second = sleeper(&clock, "second", ns(200), &tx);
    clock.wait_for_pending(2);

    clock.advance(ns(150));
    assert_eq!(clock.pending_count(), 1);
    assert_eq!(rx.recv_timeout(RECV_LIMIT).unwrap(), "first");
    first.join().unwrap();

    assert_eq!(clock.advance_to_next_event(), ns(50));
    assert_eq!(clock.pending_count(), 0);
    assert_eq!(rx.recv_timeout(RECV_LIMIT).unwrap(), "second");
    second.join().unwrap();
    assert_eq!(clock.now(), at(200));
}

#[test]
fn chained_sleeps_on_one_thread() {
    let clock = VirtualClock::new();
    let handle = {
        let clock = clock.clone();
        thread::spawn(move || {
            clock.sleep(ns(100));
            clock.sleep(ns(300));
        })
    };

    clock.wait_for_pending(1);
    assert_eq!(clock.advance_to_next_event(), ns(100));
    clock.wait_for_pending(1);
    assert_eq!(clock.advance_to_next_event(), ns(300));
    handle.join().unwrap();
    assert_eq!(clock.now(), at(400));
}

#[test]
fn five_waiters_stepped_in_due_order() {
    let clock = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let handles: Vec<_> = [500u64, 200, 800, 100, 400]
        .into_iter()
        .map(|d| sleeper(&clock, "w", ns(d), &tx))
        .collect();
    clock.wait_for_pending(handles.len());

    for (step, expected) in [100u64, 100, 200, 100, 300].into_iter().enumerate() {
        assert_eq!(clock.advance_to_next_event(), ns(expected), "advance step {}", step + 1);
        rx.recv_timeout(RECV_LIMIT).unwrap();
    }
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(clock.now().elapsed_since_origin(), ns(800));
}

#[test]
fn tied_waiters_released_by_single_next_event() {
    telemetry::init_test_logging();
    let clock = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let tied: Vec<_> = (0..3).map(|_| sleeper(&clock, "tied", ns(250), &tx)).collect();
    let later = sleeper(&clock, "later", ns(400), &tx);
    clock.wait_for_pending(4);

    assert_eq!(clock.advance_to_next_event(), ns(250));
    assert_eq!(clock.pending_count(), 1);
    for h in tied {
        h.join().unwrap();
    }
    let woke: Vec<_> = (0..3).map(|_| rx.recv_timeout(RECV_LIMIT).unwrap()).collect();
    assert_eq!(woke, vec!["tied"; 3]);

    assert_eq!(clock.advance_to_next_event(), ns(150));
    later.join().unwrap();
    assert_eq!(rx.recv_timeout(RECV_LIMIT).unwrap(), "later");
}

#[test]
fn fixed_advance_leaves_later_waiters_untouched() {
    let clock = VirtualClock::new();
    let (tx, _rx) = mpsc::channel();
    let handles: Vec<_> =
        [10u64, 20, 30, 40].into_iter().map(|d| sleeper(&clock, "w", ns(d), &tx)).collect();
    clock.wait_for_pending(4);

    clock.advance(ns(25));
    assert_eq!(clock.pending_count(), 2);
    assert_eq!(clock.next_due(), Some(at(30)));

    clock.advance(ns(100));
    assert_eq!(clock.pending_count(), 0);
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn zero_duration_sleep_still_needs_an_advance() {
    let clock = VirtualClock::new();
    clock.advance(ns(40));
    let done = Arc::new(AtomicBool::new(false));
    let handle = {
        let clock = clock.clone();
        let done = done.clone();
        thread::spawn(move || {
            clock.sleep(Duration::ZERO);
            done.store(true, Ordering::SeqCst);
        })
    };
    clock.wait_for_pending(1);
    thread::sleep(Duration::from_millis(5));
    assert!(!done.load(Ordering::SeqCst));
    assert_eq!(clock.next_due(), Some(at(40)));

    clock.advance(Duration::ZERO);
    handle.join().unwrap();
    assert!(done.load(Ordering::SeqCst));
    assert_eq!(clock.now(), at(40));
}

#[test]
fn zero_duration_sleep_via_next_event_advances_nothing() {
    let clock = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let handle = sleeper(&clock, "zero", Duration::ZERO, &tx);
    clock.wait_for_pending(1);

    assert_eq!(clock.advance_to_next_event(), Duration::ZERO);
    assert_eq!(rx.recv_timeout(RECV_LIMIT).unwrap(), "zero");
    handle.join().unwrap();
    assert_eq!(clock.now(), Instant::ORIGIN);
    assert_eq!(clock.stats().advances, 1);
}

#[test]
fn independent_clocks_do_not_interfere() {
    telemetry::init_test_logging();
    let a = VirtualClock::new();
    let b = VirtualClock::new();
    let (tx, rx) = mpsc::channel();
    let on_a = sleeper(&a, "a", ns(100), &tx);
    let on_b = sleeper(&b, "b", ns(100), &tx);
    a.wait_for_pending(1);
    b.wait_for_pending(1);

    b.advance(ns(1_000));
    assert_eq!(rx.recv_timeout(RECV_LIMIT).unwrap(), "b");
    on_b.join().unwrap();
    assert_eq!(a.pending_count(), 1);
    assert_eq!(a.now(), Instant::ORIGIN);

    assert_eq!(a.advance_to_next_event(), ns(100));
    on_a.join().unwrap();
    assert_eq!(b.now(), at(1_000));
}

#[test]
fn bounded_wait_reports_shortfall() {
    let clock = VirtualClock::new();
    let err = clock.wait_for_pending_timeout(2, Duration::from_millis(20)).unwrap_err();
    match err {
        Error::PendingTimeout { expected, observed, waited } => {
            assert_eq!(expected, 2);
            assert_eq!(observed, 0);
            assert!(waited >= Duration::from_millis(20));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(clock.wait_for_pending_timeout(0, Duration::ZERO).is_ok());
}

#[test]
fn bounded_wait_succeeds_once_registered() {
    let clock = VirtualClock::new();
    let (tx, _rx) = mpsc::channel();
    let handle = sleeper(&clock, "w", ns(5), &tx);
    clock.wait_for_pending_timeout(1, RECV_LIMIT).unwrap();
    clock.advance(ns(5));
    handle.join().unwrap();
}
