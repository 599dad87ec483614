//! Time source for connect deadlines and reconnect backoff

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

/// Source of time and sleeping
pub trait Clock: Send + Sync + fmt::Debug {
    /// The current instant
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`Instant`] and [`thread::sleep`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Clock whose time only moves when something sleeps on it
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    start: Instant,
    elapsed: parking_lot::Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: parking_lot::Mutex::new(Duration::ZERO),
        }
    }

    /// Virtual time slept so far
    pub(crate) fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }

    fn sleep(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
        // Give threads running on real time a chance to progress
        thread::sleep(Duration::from_micros(200));
    }
}
