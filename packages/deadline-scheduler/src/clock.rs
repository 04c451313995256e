use crate::{Clock, Millis};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Wall clock measured from the moment it was created.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Millis {
        // Saturates after ~292 million years of uptime.
        Millis::try_from(self.origin.elapsed().as_millis()).unwrap_or(Millis::MAX)
    }
}

/// A clock that only moves when told to.
/// Clones share the same reading, so a test can keep one copy and hand the other to a scheduler.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Millis>>,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: Millis) {
        debug_assert!(now >= self.now.get(), "ManualClock must not go backwards");
        self.now.set(now);
    }

    pub fn advance(&self, by: Millis) {
        self.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }
}
