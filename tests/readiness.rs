use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use brewpad_catalog::readiness::{ReadinessGate, Signal, min_display_time};

const ALL_SIGNALS: [Signal; 3] = [
    Signal::LocalLoaded,
    Signal::MinTimeElapsed,
    Signal::SyncAttempted,
];

#[test]
fn withholding_any_signal_keeps_gate_closed() {
    for withheld in ALL_SIGNALS {
        let gate = ReadinessGate::new();
        for signal in ALL_SIGNALS.into_iter().filter(|s| *s != withheld) {
            gate.mark(signal);
        }
        assert!(!gate.is_ready(), "ready without {withheld:?}");
        assert!(!gate.wait_ready(Duration::from_millis(10)));

        assert!(gate.mark(withheld));
        assert!(gate.is_ready());
    }
}

#[test]
fn signal_order_does_not_matter() {
    let gate = ReadinessGate::new();
    assert!(!gate.mark(Signal::SyncAttempted));
    assert!(!gate.mark(Signal::MinTimeElapsed));
    assert!(gate.mark(Signal::LocalLoaded));
    assert!(gate.mark(Signal::SyncAttempted));
    assert!(gate.status().ready);
}

#[test]
fn timer_sets_min_time_signal() {
    let gate = Arc::new(ReadinessGate::new());
    gate.mark(Signal::LocalLoaded);
    gate.mark(Signal::SyncAttempted);
    let handle = gate.start_min_timer(Duration::from_millis(20));

    assert!(gate.wait_ready(Duration::from_secs(5)));
    handle.join().unwrap();
    assert!(gate.status().min_time_elapsed);
}

#[test]
fn birthday_extends_display_time() {
    let base = Duration::from_secs(2);
    let extended = Duration::from_secs(3);
    let today = NaiveDate::from_ymd_opt(2026, 7, 4).unwrap();

    assert_eq!(min_display_time(today, None, base, extended), base);
    assert_eq!(
        min_display_time(today, NaiveDate::from_ymd_opt(1988, 7, 4), base, extended),
        extended
    );
    assert_eq!(
        min_display_time(today, NaiveDate::from_ymd_opt(2026, 7, 5), base, extended),
        base
    );
}
