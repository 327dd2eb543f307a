use core::ops::Add;
use core::time::Duration;

use lock_core::event::{LockAction, LockActor};
use lock_core::lock::{BoltLock, DoorState, LockEvent, LockObserver, LockState};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MockInstant(u64);

impl MockInstant {
    fn millis(value: u64) -> Self {
        Self(value)
    }
}

impl Add<Duration> for MockInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.as_millis() as u64)
    }
}

#[derive(Default)]
struct Recorder {
    events: Vec<LockEvent>,
}

impl LockObserver for Recorder {
    fn on_lock_event(&mut self, event: LockEvent) {
        self.events.push(event);
    }
}

impl Recorder {
    fn count(&self, matcher: impl Fn(&LockEvent) -> bool) -> usize {
        self.events.iter().filter(|event| matcher(event)).count()
    }
}

/// Steps the lock forward in 10 ms increments, mimicking the app task cadence.
fn run_until(lock: &mut BoltLock<MockInstant>, sink: &mut Recorder, from_ms: u64, to_ms: u64) {
    let mut t = from_ms;
    while t <= to_ms {
        lock.poll(MockInstant::millis(t), sink);
        t += 10;
    }
}

#[test]
fn ten_second_relock_cycle_with_door_check_disabled() {
    let mut sink = Recorder::default();
    let mut lock: BoltLock<MockInstant> = BoltLock::new();
    lock.set_door_check_enabled(false);
    lock.set_auto_lock_duration_secs(10);

    assert!(lock.initiate_action(
        LockActor::RemoteMethod,
        LockAction::Unlock,
        MockInstant::millis(0),
        &mut sink
    ));

    // Actuator completes at 2 s; relock timer arms for 10 s from there.
    run_until(&mut lock, &mut sink, 0, 2_000);
    assert_eq!(lock.state(), LockState::UnlockingCompleted);
    assert!(lock.relock_timer_armed());

    // Just before the relock deadline nothing has moved.
    run_until(&mut lock, &mut sink, 2_010, 11_990);
    assert_eq!(lock.state(), LockState::UnlockingCompleted);

    // At 12 s the relock fires and the actuator starts moving.
    run_until(&mut lock, &mut sink, 12_000, 12_000);
    assert_eq!(lock.state(), LockState::LockingInitiated);

    // Two more seconds of actuator travel finish the cycle.
    run_until(&mut lock, &mut sink, 12_010, 14_000);
    assert_eq!(lock.state(), LockState::LockingCompleted);

    // Once locked, nothing re-arms.
    run_until(&mut lock, &mut sink, 14_010, 40_000);
    assert!(!lock.relock_timer_armed());
    assert_eq!(lock.state(), LockState::LockingCompleted);

    assert_eq!(
        sink.count(|event| matches!(event, LockEvent::RelockTriggered)),
        1
    );
    assert_eq!(
        sink.count(|event| matches!(
            event,
            LockEvent::ActionCompleted {
                action: LockAction::Lock
            }
        )),
        1
    );
}

#[test]
fn rapid_duplicate_unlock_requests_yield_one_completion() {
    let mut sink = Recorder::default();
    let mut lock: BoltLock<MockInstant> = BoltLock::new();
    lock.set_auto_relock_enabled(false);

    assert!(lock.initiate_action(
        LockActor::RemoteMethod,
        LockAction::Unlock,
        MockInstant::millis(0),
        &mut sink
    ));
    assert!(!lock.initiate_action(
        LockActor::RemoteMethod,
        LockAction::Unlock,
        MockInstant::millis(5),
        &mut sink
    ));
    assert_eq!(lock.state(), LockState::UnlockingInitiated);

    run_until(&mut lock, &mut sink, 0, 5_000);

    assert_eq!(
        sink.count(|event| matches!(
            event,
            LockEvent::ActionCompleted {
                action: LockAction::Unlock
            }
        )),
        1
    );
}

#[test]
fn unlock_completion_triggers_exactly_one_evaluation() {
    let mut sink = Recorder::default();
    let mut lock: BoltLock<MockInstant> = BoltLock::new();
    lock.set_door_check_enabled(false);

    lock.initiate_action(
        LockActor::PhysicalButton,
        LockAction::Unlock,
        MockInstant::millis(0),
        &mut sink,
    );
    run_until(&mut lock, &mut sink, 0, 3_000);

    // One completion, one arm: the evaluation ran exactly once.
    assert_eq!(
        sink.count(|event| matches!(event, LockEvent::ActionCompleted { .. })),
        1
    );
    assert_eq!(
        sink.count(|event| matches!(event, LockEvent::RelockArmed { .. })),
        1
    );
}

#[test]
fn open_door_holds_off_relock_until_closed() {
    let mut sink = Recorder::default();
    let mut lock: BoltLock<MockInstant> = BoltLock::new();
    lock.set_auto_lock_duration_secs(5);
    lock.set_door_state(Some(DoorState::Open), MockInstant::millis(0), &mut sink);

    lock.initiate_action(
        LockActor::RemoteMethod,
        LockAction::Unlock,
        MockInstant::millis(0),
        &mut sink,
    );
    run_until(&mut lock, &mut sink, 0, 30_000);

    // Door open the whole time: still unlocked, no timer.
    assert_eq!(lock.state(), LockState::UnlockingCompleted);
    assert!(!lock.relock_timer_armed());

    // Closing the door arms within one evaluation.
    lock.set_door_state(Some(DoorState::Closed), MockInstant::millis(30_000), &mut sink);
    assert!(lock.relock_timer_armed());

    run_until(&mut lock, &mut sink, 30_010, 37_500);
    assert_eq!(lock.state(), LockState::LockingCompleted);
}
