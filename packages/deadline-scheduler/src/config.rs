use crate::Millis;
use crate::error::SchedulerError;
use crate::priority::{self, PriorityLevel};
use serde::{Deserialize, Serialize};

/// Length of one time slice before the work loop offers to yield.
pub const DEFAULT_FRAME_INTERVAL: Millis = 5;

/// Per-level timeouts. Must be strictly increasing from `immediate` to `idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityTimeouts {
    pub immediate: Millis,
    pub user_blocking: Millis,
    pub normal: Millis,
    pub low: Millis,
    pub idle: Millis,
}

impl Default for PriorityTimeouts {
    fn default() -> Self {
        Self {
            immediate: priority::IMMEDIATE_TIMEOUT,
            user_blocking: priority::USER_BLOCKING_TIMEOUT,
            normal: priority::NORMAL_TIMEOUT,
            low: priority::LOW_TIMEOUT,
            idle: priority::IDLE_TIMEOUT,
        }
    }
}

impl PriorityTimeouts {
    pub fn timeout_for(&self, level: PriorityLevel) -> Millis {
        match level {
            PriorityLevel::Immediate => self.immediate,
            PriorityLevel::UserBlocking => self.user_blocking,
            PriorityLevel::Normal => self.normal,
            PriorityLevel::Low => self.low,
            PriorityLevel::Idle => self.idle,
        }
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        for pair in PriorityLevel::ALL.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let (lower_timeout, higher_timeout) = (self.timeout_for(lower), self.timeout_for(higher));
            if lower_timeout >= higher_timeout {
                return Err(SchedulerError::TimeoutsOutOfOrder {
                    lower,
                    lower_timeout,
                    higher,
                    higher_timeout,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Elapsed time after which `should_yield` starts returning true.
    pub frame_interval: Millis,
    pub timeouts: PriorityTimeouts,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            timeouts: PriorityTimeouts::default(),
        }
    }
}

impl SchedulerConfig {
    /// Size the time slice to fit `fps` frames per second.
    /// Rates above 125fps would need a sub-millisecond slice and are rejected.
    pub fn with_frame_rate(mut self, fps: u32) -> Result<Self, SchedulerError> {
        if fps == 0 || fps > 125 {
            return Err(SchedulerError::InvalidFrameRate(fps));
        }
        self.frame_interval = Millis::from(1000 / fps);
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.frame_interval <= 0 {
            return Err(SchedulerError::InvalidFrameInterval(self.frame_interval));
        }
        self.timeouts.validate()
    }
}
