use crate::{Host, WakeSignal};

/// Drives the scheduler from a tokio current-thread runtime.
///
/// Each wake signal becomes a task on the surrounding `tokio::task::LocalSet`,
/// so the work loop runs on a later poll of the runtime rather than inside `submit`.
/// Arming outside a `LocalSet` panics, as `spawn_local` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioHost;

impl TokioHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for TokioHost {
    fn arm_wake_signal(&self, on_fire: WakeSignal) {
        tokio::task::spawn_local(async move {
            on_fire();
        });
    }
}
