use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::heap::MinHeap;
use crate::priority::{PriorityLevel, expiration_time};
use crate::task::{Continuation, QueuedTask, Task, TaskHandle, TaskKey, TaskState};
use crate::{Clock, Host, Millis};
use serde::Serialize;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Result of one pass of the work loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// The queue is empty.
    Idle,
    /// Work remains; the loop stopped to give the host its turn back.
    MoreWork,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub submitted: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Callbacks that handed back a continuation.
    pub continuations: u64,
    /// Callbacks invoked after their deadline had passed.
    pub timed_out: u64,
    pub flushes: u64,
    /// Flushes that stopped early because the time slice ran out.
    pub yields: u64,
}

struct Inner {
    config: SchedulerConfig,
    clock: Box<dyn Clock>,
    host: Box<dyn Host>,
    tasks: RefCell<SlotMap<TaskKey, Task>>,
    queue: RefCell<MinHeap<QueuedTask>>,
    next_id: Cell<u64>,
    current_task: Cell<Option<TaskKey>>,
    current_priority: Cell<Option<PriorityLevel>>,
    slice_start: Cell<Millis>,
    /// A wake signal is armed and has not fired yet.
    wake_armed: Cell<bool>,
    /// The work loop is on the stack.
    performing_work: Cell<bool>,
    stats: RefCell<SchedulerStats>,
}

/// Single-threaded cooperative scheduler.
///
/// Tasks run in deadline order, where the deadline is the submission time plus
/// the timeout of the task's priority level. The work loop runs on host turns
/// and hands control back once its time slice is spent, unless the next task is
/// already overdue.
///
/// `Scheduler` is a cheap handle: clone it into callbacks that need to submit
/// more work or check `should_yield`.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl Scheduler {
    pub fn new(clock: impl Clock + 'static, host: impl Host + 'static) -> Self {
        Self::build(SchedulerConfig::default(), Box::new(clock), Box::new(host))
    }

    pub fn with_config(
        config: SchedulerConfig,
        clock: impl Clock + 'static,
        host: impl Host + 'static,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self::build(config, Box::new(clock), Box::new(host)))
    }

    fn build(config: SchedulerConfig, clock: Box<dyn Clock>, host: Box<dyn Host>) -> Self {
        tracing::debug!(
            frame_interval = config.frame_interval,
            "creating deadline scheduler"
        );
        Self {
            inner: Rc::new(Inner {
                config,
                clock,
                host,
                tasks: RefCell::new(SlotMap::with_key()),
                queue: RefCell::new(MinHeap::new()),
                next_id: Cell::new(1),
                current_task: Cell::new(None),
                current_priority: Cell::new(None),
                slice_start: Cell::new(0),
                wake_armed: Cell::new(false),
                performing_work: Cell::new(false),
                stats: RefCell::new(SchedulerStats::default()),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Queue `callback` at `priority_level`.
    ///
    /// Never runs the callback inline, even for `Immediate` work; it only sorts
    /// first. Arms the host if no work loop is pending or running.
    pub fn submit<F>(&self, priority_level: PriorityLevel, callback: F) -> TaskHandle
    where
        F: FnOnce(bool) -> Continuation + 'static,
    {
        let inner = &self.inner;
        let start_time = inner.clock.now();
        let timeout = inner.config.timeouts.timeout_for(priority_level);
        let expiration_time = expiration_time(start_time, timeout);

        let id = inner.next_id.get();
        inner.next_id.set(id + 1);

        let key = inner.tasks.borrow_mut().insert(Task {
            id,
            state: TaskState::Pending(Box::new(callback)),
            priority_level,
            start_time,
            expiration_time,
        });
        inner.queue.borrow_mut().push(QueuedTask {
            key,
            id,
            sort_index: expiration_time,
        });
        self.record(|stats| stats.submitted += 1);

        tracing::trace!(id, ?priority_level, expiration_time, "task submitted");

        if !inner.wake_armed.get() && !inner.performing_work.get() {
            self.arm();
        }

        TaskHandle {
            key,
            id,
            priority_level,
        }
    }

    /// Mark a task so it is discarded instead of run. The queue itself is not touched.
    /// Cancelling a task that already finished or was already cancelled does nothing.
    pub fn cancel(&self, handle: TaskHandle) {
        let dropped = {
            let mut tasks = self.inner.tasks.borrow_mut();
            match tasks.get_mut(handle.key) {
                Some(task) if task.id == handle.id => match task.state {
                    TaskState::Pending(_) | TaskState::Running => {
                        Some(std::mem::replace(&mut task.state, TaskState::Cancelled))
                    }
                    TaskState::Cancelled | TaskState::Completed => None,
                },
                _ => None,
            }
        };

        match dropped {
            Some(state) => {
                self.record(|stats| stats.cancelled += 1);
                tracing::trace!(id = handle.id, "task cancelled");
                // Dropped outside the borrow: the callback's captures may call back into us.
                drop(state);
            }
            None => tracing::trace!(id = handle.id, "cancel ignored, task already retired"),
        }
    }

    /// Priority of the task currently executing, or `None` when no task is.
    pub fn current_priority_level(&self) -> Option<PriorityLevel> {
        self.inner.current_priority.get()
    }

    /// True once the current time slice has been used up.
    /// Meant to be polled by long-running callbacks deciding whether to suspend.
    pub fn should_yield(&self) -> bool {
        let elapsed = self
            .inner
            .clock
            .now()
            .saturating_sub(self.inner.slice_start.get());
        elapsed >= self.inner.config.frame_interval
    }

    /// Run `f` with `current_priority_level` reporting `level`.
    pub fn run_with_priority<R>(&self, level: PriorityLevel, f: impl FnOnce() -> R) -> R {
        let previous = self.inner.current_priority.replace(Some(level));
        let _restore = RestorePriority {
            inner: &self.inner,
            previous,
        };
        f()
    }

    /// True when no task, pending or lazily cancelled, is left in the queue.
    pub fn is_idle(&self) -> bool {
        self.inner.queue.borrow().is_empty()
    }

    /// Number of queue entries, including cancelled ones not yet discarded.
    pub fn pending_tasks(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.inner.stats.borrow().clone()
    }

    /// Run one slice of the work loop now.
    ///
    /// Hosts normally never call this: armed wake signals do. It is public for
    /// embedders that drive the loop themselves; such a caller must keep calling
    /// it while it returns `FlushStatus::MoreWork`.
    pub fn flush(&self) -> Result<FlushStatus, SchedulerError> {
        let inner = &self.inner;
        if inner.performing_work.get() {
            return Err(SchedulerError::ReentrantFlush);
        }

        let _work = WorkGuard {
            inner,
            previous_priority: inner.current_priority.get(),
        };
        inner.performing_work.set(true);
        inner.slice_start.set(inner.clock.now());
        self.record(|stats| stats.flushes += 1);

        let status = self.work_loop();
        tracing::debug!(?status, pending = self.pending_tasks(), "flush finished");
        Ok(status)
    }

    fn work_loop(&self) -> FlushStatus {
        let inner = &self.inner;
        loop {
            let Some(next) = inner.queue.borrow().peek().copied() else {
                return FlushStatus::Idle;
            };

            let now = inner.clock.now();
            if next.sort_index > now && self.should_yield() {
                self.record(|stats| stats.yields += 1);
                tracing::trace!(id = next.id, "time slice spent, yielding to host");
                return FlushStatus::MoreWork;
            }

            let taken = inner
                .tasks
                .borrow_mut()
                .get_mut(next.key)
                .and_then(|task| {
                    let priority_level = task.priority_level;
                    task.state
                        .take_callback()
                        .map(|callback| (callback, priority_level))
                });

            let Some((callback, priority_level)) = taken else {
                tracing::trace!(id = next.id, "discarding cancelled or retired task");
                self.pop_top();
                continue;
            };

            let did_timeout = next.sort_index <= now;
            if did_timeout {
                self.record(|stats| stats.timed_out += 1);
            }

            inner.current_task.set(Some(next.key));
            inner.current_priority.set(Some(priority_level));
            tracing::trace!(id = next.id, ?priority_level, did_timeout, "running task");

            let continuation = callback(did_timeout);
            inner.current_task.set(None);

            match continuation {
                Continuation::Suspended(resume) => {
                    let resumed = {
                        let mut tasks = inner.tasks.borrow_mut();
                        match tasks.get_mut(next.key) {
                            Some(task) if matches!(task.state, TaskState::Running) => {
                                task.state = TaskState::Pending(resume);
                                None
                            }
                            // Cancelled from inside its own callback.
                            _ => Some(resume),
                        }
                    };

                    match resumed {
                        None => {
                            self.record(|stats| stats.continuations += 1);
                            tracing::trace!(id = next.id, "task suspended");
                            return FlushStatus::MoreWork;
                        }
                        Some(discarded) => {
                            drop(discarded);
                            tracing::trace!(id = next.id, "dropping continuation of cancelled task");
                            self.retire(next.key);
                        }
                    }
                }
                Continuation::Done => {
                    self.record(|stats| stats.completed += 1);
                    self.retire(next.key);
                }
            }
        }
    }

    /// Remove a task that just ran. If something that sorts earlier was
    /// submitted meanwhile, the task is only marked and popped later.
    fn retire(&self, key: TaskKey) {
        let on_top = self
            .inner
            .queue
            .borrow()
            .peek()
            .is_some_and(|top| top.key == key);

        if on_top {
            self.pop_top();
        } else if let Some(task) = self.inner.tasks.borrow_mut().get_mut(key) {
            if matches!(task.state, TaskState::Running) {
                task.state = TaskState::Completed;
            }
        }
    }

    fn pop_top(&self) {
        let popped = self.inner.queue.borrow_mut().pop();
        if let Some(entry) = popped {
            let task = self.inner.tasks.borrow_mut().remove(entry.key);
            drop(task);
        }
    }

    fn arm(&self) {
        self.inner.wake_armed.set(true);
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        self.inner.host.arm_wake_signal(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Scheduler { inner }.on_host_turn();
            }
        }));
    }

    fn on_host_turn(&self) {
        self.inner.wake_armed.set(false);
        // Re-arms on every exit path, including a callback unwinding through us.
        let _rearm = RearmGuard { scheduler: self };
        if let Err(err) = self.flush() {
            tracing::warn!(%err, "wake signal fired inside a running flush");
        }
    }

    fn record(&self, update: impl FnOnce(&mut SchedulerStats)) {
        update(&mut self.inner.stats.borrow_mut());
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending_tasks", &self.pending_tasks())
            .field("current_priority", &self.inner.current_priority.get())
            .field("wake_armed", &self.inner.wake_armed.get())
            .field("performing_work", &self.inner.performing_work.get())
            .finish()
    }
}

/// Restores loop bookkeeping when a flush ends, normally or by unwinding.
struct WorkGuard<'a> {
    inner: &'a Inner,
    previous_priority: Option<PriorityLevel>,
}

impl Drop for WorkGuard<'_> {
    fn drop(&mut self) {
        // Only still set if a callback unwound. Its callback is gone, so the task can never run again.
        if let Some(key) = self.inner.current_task.take() {
            if let Ok(mut tasks) = self.inner.tasks.try_borrow_mut() {
                if let Some(task) = tasks.get_mut(key) {
                    tracing::warn!(id = task.id, "task callback unwound, discarding task");
                    task.state = TaskState::Cancelled;
                }
            }
        }
        self.inner.current_priority.set(self.previous_priority);
        self.inner.performing_work.set(false);
    }
}

struct RearmGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for RearmGuard<'_> {
    fn drop(&mut self) {
        let inner = &self.scheduler.inner;
        if !inner.wake_armed.get() && !inner.performing_work.get() && !self.scheduler.is_idle() {
            self.scheduler.arm();
        }
    }
}

struct RestorePriority<'a> {
    inner: &'a Inner,
    previous: Option<PriorityLevel>,
}

impl Drop for RestorePriority<'_> {
    fn drop(&mut self) {
        self.inner.current_priority.set(self.previous);
    }
}
