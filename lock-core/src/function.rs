//! Function-button gesture interpreter and factory-reset arming.
//!
//! A press on the function button starts a three-stage gesture: releasing
//! within the trigger window requests a software-update check, holding past it
//! arms a factory reset, and only holding through the cancellation window as
//! well commits the reset. Releasing while armed cancels. The machine is
//! independent of the bolt-lock state machine; both share the event queue and
//! the indicator outputs.

use core::ops::Add;
use core::time::Duration;

use crate::config::{FACTORY_RESET_CANCEL_WINDOW, FACTORY_RESET_TRIGGER_TIMEOUT};

/// Stage of the function-button gesture.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FunctionState {
    /// No gesture in progress.
    Idle,
    /// Button held; releasing now requests an update check.
    ArmedForUpdate,
    /// Held past the trigger window; releasing now cancels the reset.
    ArmedForReset,
    /// Terminal: the cancellation window elapsed and the reset fired.
    FactoryReset,
}

/// Outcome reported when the gesture advances.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FunctionEvent {
    /// Short press resolved: check for (or abort) a software update.
    UpdateCheckRequested,
    /// The factory reset is armed; indicators switch to the arming blink.
    ResetArmed,
    /// The pending reset was cancelled; indicators return to normal.
    ResetCancelled,
    /// The reset committed. The device wipes itself; no further events
    /// are meaningful.
    FactoryReset,
}

/// State machine for the single function button.
pub struct FunctionMachine<I> {
    state: FunctionState,
    deadline: Option<I>,
    trigger_timeout: Duration,
    cancel_window: Duration,
}

impl<I> FunctionMachine<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates an idle machine with the default windows.
    pub const fn new() -> Self {
        Self::with_windows(FACTORY_RESET_TRIGGER_TIMEOUT, FACTORY_RESET_CANCEL_WINDOW)
    }

    /// Creates an idle machine with explicit trigger and cancel windows.
    pub const fn with_windows(trigger_timeout: Duration, cancel_window: Duration) -> Self {
        Self {
            state: FunctionState::Idle,
            deadline: None,
            trigger_timeout,
            cancel_window,
        }
    }

    /// Returns the current gesture stage.
    pub const fn state(&self) -> FunctionState {
        self.state
    }

    /// Returns `true` while a reset is armed and releasing would cancel it.
    pub fn reset_armed(&self) -> bool {
        self.state == FunctionState::ArmedForReset
    }

    /// Returns `true` while indicators must show the synchronized arming
    /// blink: a reset is armed or has committed and the wipe is underway.
    pub fn reset_indicated(&self) -> bool {
        matches!(
            self.state,
            FunctionState::ArmedForReset | FunctionState::FactoryReset
        )
    }

    /// Returns `true` while any stage of the gesture is active; other
    /// buttons are ignored by the application task during this time.
    pub fn is_engaged(&self) -> bool {
        matches!(
            self.state,
            FunctionState::ArmedForUpdate | FunctionState::ArmedForReset
        )
    }

    /// Feeds a press on the function button.
    pub fn handle_press(&mut self, now: I) -> Option<FunctionEvent> {
        if self.state == FunctionState::Idle {
            self.state = FunctionState::ArmedForUpdate;
            self.deadline = Some(now + self.trigger_timeout);
        }
        // Presses in any other stage (including while armed) change nothing;
        // cancellation is release-driven.
        None
    }

    /// Feeds a release on the function button.
    pub fn handle_release(&mut self, _now: I) -> Option<FunctionEvent> {
        match self.state {
            FunctionState::ArmedForUpdate => {
                self.state = FunctionState::Idle;
                self.deadline = None;
                Some(FunctionEvent::UpdateCheckRequested)
            }
            FunctionState::ArmedForReset => {
                self.state = FunctionState::Idle;
                self.deadline = None;
                Some(FunctionEvent::ResetCancelled)
            }
            FunctionState::Idle | FunctionState::FactoryReset => None,
        }
    }

    /// Advances the active window against `now`.
    pub fn poll(&mut self, now: I) -> Option<FunctionEvent> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }

        match self.state {
            FunctionState::ArmedForUpdate => {
                self.state = FunctionState::ArmedForReset;
                self.deadline = Some(now + self.cancel_window);
                Some(FunctionEvent::ResetArmed)
            }
            FunctionState::ArmedForReset => {
                self.state = FunctionState::FactoryReset;
                self.deadline = None;
                Some(FunctionEvent::FactoryReset)
            }
            FunctionState::Idle | FunctionState::FactoryReset => {
                self.deadline = None;
                None
            }
        }
    }
}

impl<I> Default for FunctionMachine<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct MockInstant(u64);

    impl Add<Duration> for MockInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            Self(self.0 + rhs.as_millis() as u64)
        }
    }

    fn millis(value: u64) -> MockInstant {
        MockInstant(value)
    }

    #[test]
    fn short_press_requests_update_check() {
        let mut machine: FunctionMachine<MockInstant> = FunctionMachine::new();

        assert_eq!(machine.handle_press(millis(0)), None);
        assert_eq!(machine.state(), FunctionState::ArmedForUpdate);
        assert_eq!(machine.poll(millis(4_999)), None);

        assert_eq!(
            machine.handle_release(millis(4_999)),
            Some(FunctionEvent::UpdateCheckRequested)
        );
        assert_eq!(machine.state(), FunctionState::Idle);
    }

    #[test]
    fn holding_through_both_windows_commits_the_reset_once() {
        let mut machine: FunctionMachine<MockInstant> = FunctionMachine::new();

        machine.handle_press(millis(0));
        assert_eq!(machine.poll(millis(5_000)), Some(FunctionEvent::ResetArmed));
        assert!(machine.reset_armed());

        // Still inside the cancellation window.
        assert_eq!(machine.poll(millis(14_999)), None);

        assert_eq!(
            machine.poll(millis(15_000)),
            Some(FunctionEvent::FactoryReset)
        );
        assert_eq!(machine.state(), FunctionState::FactoryReset);
        // The terminal state keeps the indicators in the arming blink.
        assert!(!machine.reset_armed());
        assert!(machine.reset_indicated());

        // Terminal: nothing further fires.
        assert_eq!(machine.poll(millis(60_000)), None);
        assert_eq!(machine.handle_release(millis(60_000)), None);
        assert_eq!(machine.handle_press(millis(61_000)), None);
    }

    #[test]
    fn release_inside_cancel_window_returns_to_idle() {
        let mut machine: FunctionMachine<MockInstant> = FunctionMachine::new();

        machine.handle_press(millis(0));
        assert_eq!(machine.poll(millis(5_000)), Some(FunctionEvent::ResetArmed));

        assert_eq!(
            machine.handle_release(millis(9_000)),
            Some(FunctionEvent::ResetCancelled)
        );
        assert_eq!(machine.state(), FunctionState::Idle);
        assert!(!machine.is_engaged());

        // The cancelled window must not fire later.
        assert_eq!(machine.poll(millis(30_000)), None);
    }

    #[test]
    fn repeated_presses_while_engaged_are_ignored() {
        let mut machine: FunctionMachine<MockInstant> = FunctionMachine::new();

        machine.handle_press(millis(0));
        machine.handle_press(millis(1_000));

        // The original deadline stands: the reset arms at t=5s, not t=6s.
        assert_eq!(machine.poll(millis(5_000)), Some(FunctionEvent::ResetArmed));
    }

    #[test]
    fn release_while_idle_is_ignored() {
        let mut machine: FunctionMachine<MockInstant> = FunctionMachine::new();
        assert_eq!(machine.handle_release(millis(100)), None);
        assert_eq!(machine.state(), FunctionState::Idle);
    }
}
