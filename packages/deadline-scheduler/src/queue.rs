use crate::{Host, WakeSignal};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// A host whose turns are run by hand.
/// Armed wake signals wait in FIFO order until `run_turn` fires the oldest one.
/// Clones share the same queue, so one copy can be given to a scheduler and the other kept to drive it.
#[derive(Clone, Default)]
pub struct TurnQueue {
    queue: Rc<RefCell<VecDeque<WakeSignal>>>,
}

impl TurnQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_turns(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Fire the oldest wake signal. Returns false if nothing was armed.
    pub fn run_turn(&self) -> bool {
        // Release the borrow first: the signal is free to arm the next turn.
        let signal = self.queue.borrow_mut().pop_front();
        match signal {
            Some(signal) => {
                signal();
                true
            }
            None => false,
        }
    }

    /// Keep running turns until no signal is armed. Returns the number of turns run.
    pub fn run_until_idle(&self) -> usize {
        let mut turns = 0;
        while self.run_turn() {
            turns += 1;
        }
        turns
    }
}

impl Host for TurnQueue {
    fn arm_wake_signal(&self, on_fire: WakeSignal) {
        self.queue.borrow_mut().push_back(on_fire);
    }
}
