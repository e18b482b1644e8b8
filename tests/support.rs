//! Shared test-only helpers for the integration suite.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use corolite::Clock;

/// A clock that advances virtual time by a small fixed step on every read,
/// so `sleep`/`wait_for` scenarios converge deterministically across
/// repeated scheduler passes without ever blocking on a real delay.
pub struct FakeClock {
    now: Cell<Instant>,
    step: Duration,
}

impl FakeClock {
    pub fn new(step: Duration) -> Rc<FakeClock> {
        Rc::new(FakeClock {
            now: Cell::new(Instant::now()),
            step,
        })
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
