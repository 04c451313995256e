use crate::Millis;
use crate::heap::HeapNode;
use crate::priority::PriorityLevel;
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    pub struct TaskKey;
}

/// A unit of work. Receives `true` when it is being run after its deadline has passed.
pub type Callback = Box<dyn FnOnce(bool) -> Continuation>;

/// What a callback hands back to the work loop.
pub enum Continuation {
    /// Nothing left to do; the task leaves the queue.
    Done,
    /// Resume later with this callback, keeping the original deadline and priority.
    Suspended(Callback),
}

impl Continuation {
    pub fn suspend(next: impl FnOnce(bool) -> Continuation + 'static) -> Self {
        Continuation::Suspended(Box::new(next))
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Done => f.write_str("Done"),
            Continuation::Suspended(_) => f.write_str("Suspended(..)"),
        }
    }
}

pub enum TaskState {
    Pending(Callback),
    /// The callback has been taken out and is executing right now.
    Running,
    Cancelled,
    /// Finished while buried in the heap; dropped once it reaches the top.
    Completed,
}

impl TaskState {
    /// Move a pending callback out, leaving the task marked as running.
    /// Any other state yields nothing and is left untouched.
    pub fn take_callback(&mut self) -> Option<Callback> {
        match std::mem::replace(self, TaskState::Running) {
            TaskState::Pending(callback) => Some(callback),
            other => {
                *self = other;
                None
            }
        }
    }
}

impl fmt::Debug for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Pending(_) => f.write_str("Pending(..)"),
            TaskState::Running => f.write_str("Running"),
            TaskState::Cancelled => f.write_str("Cancelled"),
            TaskState::Completed => f.write_str("Completed"),
        }
    }
}

#[derive(Debug)]
pub struct Task {
    pub id: u64,
    pub state: TaskState,
    pub priority_level: PriorityLevel,
    pub start_time: Millis,
    pub expiration_time: Millis,
}

/// What the heap actually stores. The task record itself stays in the slot map
/// so cancellation can reach it without touching heap order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedTask {
    pub key: TaskKey,
    pub id: u64,
    pub sort_index: Millis,
}

impl HeapNode for QueuedTask {
    fn sort_index(&self) -> Millis {
        self.sort_index
    }

    fn id(&self) -> u64 {
        self.id
    }
}

/// Returned by `Scheduler::submit`, used to cancel the task later.
/// Handles stay valid after the task is gone; cancelling one then does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub(crate) key: TaskKey,
    pub(crate) id: u64,
    pub(crate) priority_level: PriorityLevel,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn priority_level(&self) -> PriorityLevel {
        self.priority_level
    }
}
