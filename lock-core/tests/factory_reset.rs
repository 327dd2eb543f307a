use core::ops::Add;
use core::time::Duration;

use lock_core::button::{ButtonEdge, ButtonGesture, ButtonMonitor, FUNCTION_BUTTON};
use lock_core::function::{FunctionEvent, FunctionMachine, FunctionState};

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

/// Couples the gesture monitor to the function machine the way the
/// application task does: edges feed both, and the machine's windows are
/// swept on the same cadence as the button deadlines.
struct Harness {
    monitor: ButtonMonitor<MockInstant>,
    machine: FunctionMachine<MockInstant>,
    events: Vec<FunctionEvent>,
}

impl Harness {
    fn new() -> Self {
        Self {
            monitor: ButtonMonitor::new(),
            machine: FunctionMachine::new(),
            events: Vec::new(),
        }
    }

    fn edge(&mut self, edge: ButtonEdge, at_ms: u64) {
        let now = MockInstant::millis(at_ms);
        if let Some(gesture) = self.monitor.handle_edge(FUNCTION_BUTTON, edge, now) {
            let event = match gesture {
                ButtonGesture::Press => self.machine.handle_press(now),
                ButtonGesture::Release | ButtonGesture::LongPressRelease => {
                    self.machine.handle_release(now)
                }
                ButtonGesture::LongPress => None,
            };
            self.events.extend(event);
        }
    }

    fn run_until(&mut self, from_ms: u64, to_ms: u64) {
        let mut t = from_ms;
        while t <= to_ms {
            let now = MockInstant::millis(t);
            let _ = self.monitor.poll(now);
            self.events.extend(self.machine.poll(now));
            t += 10;
        }
    }
}

#[test]
fn full_hold_commits_the_reset() {
    let mut harness = Harness::new();

    harness.edge(ButtonEdge::Press, 0);
    harness.run_until(0, 15_000);

    assert_eq!(
        harness.events,
        vec![FunctionEvent::ResetArmed, FunctionEvent::FactoryReset]
    );
    assert_eq!(harness.machine.state(), FunctionState::FactoryReset);
}

#[test]
fn release_during_cancel_window_aborts() {
    let mut harness = Harness::new();

    harness.edge(ButtonEdge::Press, 0);
    harness.run_until(0, 8_990);
    assert!(harness.machine.reset_armed());

    harness.edge(ButtonEdge::Release, 9_000);
    harness.run_until(9_000, 30_000);

    assert_eq!(
        harness.events,
        vec![FunctionEvent::ResetArmed, FunctionEvent::ResetCancelled]
    );
    assert_eq!(harness.machine.state(), FunctionState::Idle);
}

#[test]
fn short_press_requests_update_and_never_arms() {
    let mut harness = Harness::new();

    harness.edge(ButtonEdge::Press, 0);
    harness.run_until(0, 2_000);
    harness.edge(ButtonEdge::Release, 2_000);
    harness.run_until(2_010, 20_000);

    assert_eq!(harness.events, vec![FunctionEvent::UpdateCheckRequested]);
    assert_eq!(harness.machine.state(), FunctionState::Idle);
}

#[test]
fn second_gesture_after_cancel_starts_fresh_windows() {
    let mut harness = Harness::new();

    harness.edge(ButtonEdge::Press, 0);
    harness.run_until(0, 6_000);
    harness.edge(ButtonEdge::Release, 6_000);
    assert_eq!(harness.machine.state(), FunctionState::Idle);

    // A new hold measures its trigger window from the new press.
    harness.edge(ButtonEdge::Press, 10_000);
    harness.run_until(10_000, 14_990);
    assert_eq!(harness.machine.state(), FunctionState::ArmedForUpdate);
    harness.run_until(15_000, 15_000);
    assert!(harness.machine.reset_armed());
}
