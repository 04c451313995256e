use crate::Millis;
use crate::priority::PriorityLevel;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("flush requested while the work loop is already running")]
    ReentrantFlush,

    #[error("frame interval must be positive, got {0}ms")]
    InvalidFrameInterval(Millis),

    #[error("frame rate must be within 1..=125 fps, got {0}")]
    InvalidFrameRate(u32),

    #[error("timeout for {lower:?} ({lower_timeout}ms) must be shorter than for {higher:?} ({higher_timeout}ms)")]
    TimeoutsOutOfOrder {
        lower: PriorityLevel,
        lower_timeout: Millis,
        higher: PriorityLevel,
        higher_timeout: Millis,
    },
}
