pub mod clock;
pub mod config;
pub mod error;
pub mod heap;
pub mod priority;
pub mod queue;
pub mod scheduler;
pub mod task;
#[cfg(feature = "tokio")]
pub mod tokio_host;

/// Monotonic time in milliseconds. Signed so that already-expired deadlines
/// (see `PriorityLevel::Immediate`) stay representable.
pub type Millis = i64;

/// A payload-free callback the host runs on one of its later turns.
pub type WakeSignal = Box<dyn FnOnce()>;

/// Source of "now" for deadlines and time-slice accounting.
/// Readings must never decrease and must use the same unit for the lifetime of a scheduler.
pub trait Clock {
    fn now(&self) -> Millis;
}

/// The host event loop the scheduler cooperates with.
/// This allows the work loop to be driven by any executor (Tokio, Wasm, a hand-rolled loop, etc.)
/// without the scheduler ever blocking it.
pub trait Host {
    /// Run `on_fire` exactly once, asynchronously, on a later turn of the host.
    /// Signals armed by the same scheduler must fire in the order they were armed.
    fn arm_wake_signal(&self, on_fire: WakeSignal);
}

pub use clock::{ManualClock, MonotonicClock};
pub use config::{PriorityTimeouts, SchedulerConfig};
pub use error::SchedulerError;
pub use priority::{PriorityLevel, timeout_for};
pub use queue::TurnQueue;
pub use scheduler::{FlushStatus, Scheduler, SchedulerStats};
pub use task::{Callback, Continuation, TaskHandle};
#[cfg(feature = "tokio")]
pub use tokio_host::TokioHost;
