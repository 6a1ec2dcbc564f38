//! Session clock and cooperative timers
//!
//! Timers are deadlines against the session clock. The host polls them once
//! per tick; nothing fires on its own.

/// Monotonic session time in seconds, advanced by the host each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionClock {
    now: f64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self { now: 0.0 }
    }

    /// Current session time (seconds)
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Advance by `dt` seconds. Negative or non-finite steps are ignored so
    /// timestamps never go backwards.
    pub fn advance(&mut self, dt: f64) -> f64 {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt;
        }
        self.now
    }
}

/// One-shot countdown. Arming replaces any pending deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    deadline: Option<f64>,
}

impl Timer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Arm to expire `duration` seconds after `now`
    pub fn arm(&mut self, now: f64, duration: f64) {
        self.deadline = Some(now + duration.max(0.0));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns true exactly once when the deadline has been reached, then
    /// disarms.
    pub fn poll(&mut self, now: f64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Fixed-interval timer (autosave cadence).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalTimer {
    interval: f64,
    next: f64,
}

impl IntervalTimer {
    pub fn new(start: f64, interval: f64) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    /// Returns true when an interval boundary has been crossed. A long frame
    /// that skips several boundaries fires once and realigns to the next
    /// boundary after `now`.
    pub fn poll(&mut self, now: f64) -> bool {
        if now < self.next {
            return false;
        }
        if self.interval > 0.0 {
            let skipped = ((now - self.next) / self.interval).floor() + 1.0;
            self.next += skipped * self.interval;
        } else {
            self.next = now;
        }
        true
    }
}
