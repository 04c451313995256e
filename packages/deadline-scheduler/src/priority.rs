use crate::Millis;
use serde::{Deserialize, Serialize};

/// How urgently a task wants to run.
///
/// Levels are not compared with each other directly. Each one maps to a timeout,
/// and tasks are ordered by the deadline `submitted_at + timeout` that results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriorityLevel {
    Immediate,
    UserBlocking,
    #[default]
    Normal,
    Low,
    Idle,
}

impl PriorityLevel {
    /// All levels, shortest timeout first.
    pub const ALL: [PriorityLevel; 5] = [
        PriorityLevel::Immediate,
        PriorityLevel::UserBlocking,
        PriorityLevel::Normal,
        PriorityLevel::Low,
        PriorityLevel::Idle,
    ];
}

/// Already expired: runs ahead of anything whose deadline is still in the future.
pub const IMMEDIATE_TIMEOUT: Millis = -1;
pub const USER_BLOCKING_TIMEOUT: Millis = 250;
pub const NORMAL_TIMEOUT: Millis = 5000;
pub const LOW_TIMEOUT: Millis = 10000;
/// Never expires.
pub const IDLE_TIMEOUT: Millis = Millis::MAX;

/// Default timeout for a priority level.
pub fn timeout_for(level: PriorityLevel) -> Millis {
    match level {
        PriorityLevel::Immediate => IMMEDIATE_TIMEOUT,
        PriorityLevel::UserBlocking => USER_BLOCKING_TIMEOUT,
        PriorityLevel::Normal => NORMAL_TIMEOUT,
        PriorityLevel::Low => LOW_TIMEOUT,
        PriorityLevel::Idle => IDLE_TIMEOUT,
    }
}

/// Deadline for a task submitted at `start_time` with the given timeout.
/// Saturates so an `Idle` deadline stays at the far end of the timeline.
pub fn expiration_time(start_time: Millis, timeout: Millis) -> Millis {
    start_time.saturating_add(timeout)
}
