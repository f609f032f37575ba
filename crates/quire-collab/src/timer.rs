//! Cancellable one-shot deadlines.
//!
//! A [`Watchdog`] holds no task or timer handle; its owner asks whether it
//! is due. Arming an armed watchdog replaces the old deadline.

use std::time::{Duration, Instant};

use tracing::trace;

/// A named deadline that is either armed or idle.
#[derive(Debug, Clone)]
pub struct Watchdog {
    name: &'static str,
    deadline: Option<Instant>,
}

impl Watchdog {
    pub fn new(name: &'static str) -> Self {
        Self { name, deadline: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fire `after` from `now`.
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.cancel();
        trace!(watchdog = self.name, ?after, "armed");
        self.deadline = Some(now + after);
    }

    /// Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return true if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                trace!(watchdog = self.name, "fired");
                true
            }
            _ => false,
        }
    }
}
