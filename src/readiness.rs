use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Signal {
    LocalLoaded,
    MinTimeElapsed,
    SyncAttempted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReadinessStatus {
    pub local_loaded: bool,
    pub min_time_elapsed: bool,
    pub sync_attempted: bool,
    pub ready: bool,
}

/// Latches three independent signals into one readiness flag. Signals may
/// arrive in any order; once all three are set the gate stays ready.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    state: Mutex<ReadinessStatus>,
    changed: Condvar,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one signal and returns the composite readiness afterwards.
    /// Repeated calls for the same signal are no-ops.
    pub fn mark(&self, signal: Signal) -> bool {
        let mut state = self.lock();
        let flag = match signal {
            Signal::LocalLoaded => &mut state.local_loaded,
            Signal::MinTimeElapsed => &mut state.min_time_elapsed,
            Signal::SyncAttempted => &mut state.sync_attempted,
        };
        if !*flag {
            *flag = true;
            debug!(?signal, "readiness signal set");
        }
        if !state.ready && state.local_loaded && state.min_time_elapsed && state.sync_attempted {
            state.ready = true;
            info!("catalog ready");
            self.changed.notify_all();
        }
        state.ready
    }

    pub fn is_ready(&self) -> bool {
        self.lock().ready
    }

    pub fn status(&self) -> ReadinessStatus {
        *self.lock()
    }

    /// Blocks until ready or until `timeout` passes. Returns readiness.
    pub fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        while !state.ready {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = match self.changed.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        state.ready
    }

    /// Sets [`Signal::MinTimeElapsed`] once `duration` has passed.
    pub fn start_min_timer(self: &Arc<Self>, duration: Duration) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        thread::spawn(move || {
            thread::sleep(duration);
            gate.mark(Signal::MinTimeElapsed);
        })
    }

    fn lock(&self) -> MutexGuard<'_, ReadinessStatus> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Minimum display time: `base`, or `birthday_extended` when today is the
/// user's birthday (month and day match, year ignored).
pub fn min_display_time(
    today: NaiveDate,
    birthday: Option<NaiveDate>,
    base: Duration,
    birthday_extended: Duration,
) -> Duration {
    match birthday {
        Some(birthday) if is_birthday(today, birthday) => birthday_extended,
        _ => base,
    }
}

pub fn is_birthday(today: NaiveDate, birthday: NaiveDate) -> bool {
    today.month() == birthday.month() && today.day() == birthday.day()
}
