use deadline_scheduler::{
    Clock, Continuation, ManualClock, Millis, PriorityLevel, Scheduler, TurnQueue, timeout_for,
};
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

fn setup() -> (Scheduler, ManualClock, TurnQueue) {
    let clock = ManualClock::new(0);
    let host = TurnQueue::new();
    let scheduler = Scheduler::new(clock.clone(), host.clone());
    (scheduler, clock, host)
}

fn logging_task(
    log: &Rc<RefCell<Vec<&'static str>>>,
    name: &'static str,
) -> impl FnOnce(bool) -> Continuation + 'static {
    let log = log.clone();
    move |_| {
        log.borrow_mut().push(name);
        Continuation::Done
    }
}

#[test]
fn test_same_priority_runs_in_submission_order() {
    let (scheduler, _clock, host) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));

    // Same instant, same priority: identical deadlines, so ids decide.
    scheduler.submit(PriorityLevel::Normal, logging_task(&log, "Task1"));
    scheduler.submit(PriorityLevel::Normal, logging_task(&log, "Task2"));
    scheduler.submit(PriorityLevel::Normal, logging_task(&log, "Task3"));

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["Task1", "Task2", "Task3"]);
}

#[test]
fn test_shorter_timeout_runs_first() {
    let (scheduler, _clock, host) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));

    scheduler.submit(PriorityLevel::Normal, logging_task(&log, "Task1"));
    scheduler.submit(PriorityLevel::UserBlocking, logging_task(&log, "Task2"));
    scheduler.submit(PriorityLevel::Immediate, logging_task(&log, "Task3"));

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["Task3", "Task2", "Task1"]);
}

#[test]
fn test_equal_priority_keeps_fifo_among_mixed_levels() {
    let (scheduler, _clock, host) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));

    scheduler.submit(PriorityLevel::Normal, logging_task(&log, "Task1"));
    scheduler.submit(PriorityLevel::UserBlocking, logging_task(&log, "Task2"));
    scheduler.submit(PriorityLevel::Immediate, logging_task(&log, "Task3"));
    scheduler.submit(PriorityLevel::Normal, logging_task(&log, "Task4"));

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["Task3", "Task2", "Task1", "Task4"]);
}

#[test]
fn test_overdue_low_priority_still_yields_to_earlier_deadline() {
    let (scheduler, clock, host) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));
    let timeouts = Rc::new(RefCell::new(Vec::new()));

    // Deadline 10000.
    {
        let log = log.clone();
        let timeouts = timeouts.clone();
        scheduler.submit(PriorityLevel::Low, move |did_timeout| {
            log.borrow_mut().push("Low");
            timeouts.borrow_mut().push(did_timeout);
            Continuation::Done
        });
    }

    clock.set(10000);

    // Deadline 9999: still ahead of the overdue low-priority task.
    {
        let log = log.clone();
        let timeouts = timeouts.clone();
        scheduler.submit(PriorityLevel::Immediate, move |did_timeout| {
            log.borrow_mut().push("Immediate");
            timeouts.borrow_mut().push(did_timeout);
            Continuation::Done
        });
    }

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["Immediate", "Low"]);
    assert_eq!(*timeouts.borrow(), vec![true, true]);
}

#[test]
fn test_idle_runs_after_everything_else() {
    let (scheduler, clock, host) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));

    scheduler.submit(PriorityLevel::Idle, logging_task(&log, "idle"));
    clock.advance(1_000_000);
    scheduler.submit(PriorityLevel::Low, logging_task(&log, "low"));

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["low", "idle"]);
}

#[test]
fn test_submit_never_runs_inline() {
    let (scheduler, _clock, host) = setup();
    let log = Rc::new(RefCell::new(Vec::new()));

    scheduler.submit(PriorityLevel::Immediate, logging_task(&log, "now"));

    assert!(log.borrow().is_empty());
    assert_eq!(host.pending_turns(), 1);

    assert!(host.run_turn());
    assert_eq!(*log.borrow(), vec!["now"]);
    assert!(scheduler.is_idle());
    assert!(!host.run_turn());
}

#[test]
fn test_earlier_deadline_always_runs_first() {
    let mut rng = rand::rng();

    for _ in 0..20 {
        let (scheduler, clock, host) = setup();
        let ran: Rc<RefCell<Vec<(Millis, u64)>>> = Rc::new(RefCell::new(Vec::new()));
        let count = rng.random_range(1..40);

        for _ in 0..count {
            clock.advance(rng.random_range(0..3000));
            let level = PriorityLevel::ALL[rng.random_range(0..PriorityLevel::ALL.len())];
            let deadline = clock.now().saturating_add(timeout_for(level));

            let ran = ran.clone();
            let id_cell = Rc::new(RefCell::new(0));
            let id_for_task = id_cell.clone();
            let handle = scheduler.submit(level, move |_| {
                ran.borrow_mut().push((deadline, *id_for_task.borrow()));
                Continuation::Done
            });
            *id_cell.borrow_mut() = handle.id();
        }

        // The clock stands still while draining, so the slice never runs out.
        host.run_until_idle();

        let ran = ran.borrow();
        assert_eq!(ran.len(), count);
        assert!(
            ran.windows(2).all(|pair| pair[0] <= pair[1]),
            "tasks ran out of deadline order: {:?}",
            *ran
        );
    }
}
