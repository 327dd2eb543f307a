//! Bolt-lock state machine and auto-relock coordination.
//!
//! The lock owns the actuator-movement deadline and the auto-relock deadline.
//! Both are plain `Option<Instant>` values polled by the application task, so
//! cancelling a timer is clearing the option and is idempotent by
//! construction. All mutation happens on the single consumer task; producers
//! in other contexts only post events.

use core::ops::Add;
use core::time::Duration;

use crate::config::{
    ACTUATOR_MOVEMENT_PERIOD, AUTO_LOCK_DURATION_SECS_DEFAULT, AUTO_RELOCK_ENABLED_DEFAULT,
    DOOR_CHECK_ENABLED_DEFAULT,
};
use crate::event::{LockAction, LockActor};

/// Logical state of the physical bolt.
///
/// Exactly one variant holds at any time; the `*Initiated` states are
/// transient and resolve to their `*Completed` counterpart once the actuator
/// deadline elapses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockState {
    LockingInitiated,
    LockingCompleted,
    UnlockingInitiated,
    UnlockingCompleted,
}

/// Reported position of the associated door sensor.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DoorState {
    Open,
    Closed,
}

/// Auto-relock configuration owned by the lock.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AutoRelockPolicy {
    pub enabled: bool,
    pub door_check_enabled: bool,
    pub duration_secs: u32,
}

impl AutoRelockPolicy {
    /// Factory defaults for a device without service-pushed settings.
    pub const fn new() -> Self {
        Self {
            enabled: AUTO_RELOCK_ENABLED_DEFAULT,
            door_check_enabled: DOOR_CHECK_ENABLED_DEFAULT,
            duration_secs: AUTO_LOCK_DURATION_SECS_DEFAULT,
        }
    }
}

impl Default for AutoRelockPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifications emitted synchronously while driving the lock.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockEvent {
    /// An actuation was accepted and the bolt started moving.
    ActionInitiated { action: LockAction, actor: LockActor },
    /// The bolt reached its target position.
    ActionCompleted { action: LockAction },
    /// The auto-relock timer was armed for the given delay.
    RelockArmed { seconds: u32 },
    /// An armed auto-relock timer was cancelled because the door opened.
    RelockSuspended,
    /// The auto-relock timer fired and a lock action is being requested.
    RelockTriggered,
}

/// Sink receiving [`LockEvent`] notifications.
///
/// Implementations must not block; they run on the consumer task inside the
/// lock's own state transitions.
pub trait LockObserver {
    fn on_lock_event(&mut self, event: LockEvent);
}

/// Observer that ignores every notification.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLockObserver;

impl LockObserver for NoopLockObserver {
    fn on_lock_event(&mut self, _: LockEvent) {}
}

/// The bolt-lock actuation state machine with its cooperating relock timer.
pub struct BoltLock<I> {
    state: LockState,
    actuator_period: Duration,
    actuation_deadline: Option<I>,
    relock_deadline: Option<I>,
    policy: AutoRelockPolicy,
    /// `None` until a door-sensor subscription is established.
    door_state: Option<DoorState>,
}

impl<I> BoltLock<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a lock in the `LockingCompleted` state with default policy.
    pub const fn new() -> Self {
        Self::with_actuator_period(ACTUATOR_MOVEMENT_PERIOD)
    }

    /// Creates a lock with an explicit actuator-movement period.
    pub const fn with_actuator_period(actuator_period: Duration) -> Self {
        Self {
            state: LockState::LockingCompleted,
            actuator_period,
            actuation_deadline: None,
            relock_deadline: None,
            policy: AutoRelockPolicy::new(),
            door_state: None,
        }
    }

    /// Returns the current logical state.
    pub const fn state(&self) -> LockState {
        self.state
    }

    /// Returns `true` when the bolt rests in the unlocked position.
    pub fn is_unlocked(&self) -> bool {
        self.state == LockState::UnlockingCompleted
    }

    /// Returns `true` while an actuation is in flight.
    pub fn is_action_in_progress(&self) -> bool {
        matches!(
            self.state,
            LockState::LockingInitiated | LockState::UnlockingInitiated
        )
    }

    /// Returns `true` while the auto-relock timer is scheduled.
    pub fn relock_timer_armed(&self) -> bool {
        self.relock_deadline.is_some()
    }

    /// Returns the active auto-relock policy.
    pub const fn policy(&self) -> AutoRelockPolicy {
        self.policy
    }

    /// Returns the last reported door state, if a subscription exists.
    pub const fn door_state(&self) -> Option<DoorState> {
        self.door_state
    }

    /// Enables or disables the auto-relock feature.
    ///
    /// Callers re-evaluate afterwards (typically by posting an
    /// `AutoRelockEvaluate` event) so a policy change takes effect.
    pub fn set_auto_relock_enabled(&mut self, enabled: bool) {
        self.policy.enabled = enabled;
    }

    /// Enables or disables the door-sensor gate.
    pub fn set_door_check_enabled(&mut self, enabled: bool) {
        self.policy.door_check_enabled = enabled;
    }

    /// Updates the auto-relock delay.
    pub fn set_auto_lock_duration_secs(&mut self, seconds: u32) {
        self.policy.duration_secs = seconds;
    }

    /// Attempts to start a lock or unlock actuation on behalf of `actor`.
    ///
    /// Accepted only when the current state is the completed counterpart of
    /// the requested action; otherwise returns `false` and changes nothing.
    /// Rejected requests are dropped, never queued; the caller decides
    /// whether to retry or ignore. An accepted `Lock` cancels any armed
    /// auto-relock timer first.
    pub fn initiate_action<O: LockObserver>(
        &mut self,
        actor: LockActor,
        action: LockAction,
        now: I,
        sink: &mut O,
    ) -> bool {
        let next = match (self.state, action) {
            (LockState::LockingCompleted, LockAction::Unlock) => LockState::UnlockingInitiated,
            (LockState::UnlockingCompleted, LockAction::Lock) => LockState::LockingInitiated,
            _ => return false,
        };

        if next == LockState::LockingInitiated {
            // An explicit lock pre-empts an automatic one.
            self.relock_deadline = None;
        }

        self.actuation_deadline = Some(now + self.actuator_period);
        self.state = next;
        sink.on_lock_event(LockEvent::ActionInitiated { action, actor });

        true
    }

    /// Advances expired deadlines against `now`.
    ///
    /// Completes an in-flight actuation once the actuator period elapsed
    /// (an unlock completion immediately re-evaluates the relock policy) and
    /// fires the auto-relock timer when due.
    pub fn poll<O: LockObserver>(&mut self, now: I, sink: &mut O) {
        if let Some(deadline) = self.actuation_deadline
            && now >= deadline
        {
            self.actuation_deadline = None;
            self.complete_actuation(now, sink);
        }

        if let Some(deadline) = self.relock_deadline
            && now >= deadline
        {
            self.relock_deadline = None;
            sink.on_lock_event(LockEvent::RelockTriggered);
            // A rejection here is not retried; the next completed action
            // re-evaluates from scratch.
            let _ = self.initiate_action(LockActor::LocalImplicit, LockAction::Lock, now, sink);
        }
    }

    /// Records a door-sensor update (`None` drops the subscription) and
    /// re-evaluates the relock policy.
    pub fn set_door_state<O: LockObserver>(
        &mut self,
        door: Option<DoorState>,
        now: I,
        sink: &mut O,
    ) {
        self.door_state = door;
        self.evaluate_auto_relock(now, sink);
    }

    /// Decides whether the auto-relock timer should be armed or cancelled.
    ///
    /// Invoked after every unlock completion, after door-sensor changes, and
    /// after policy reconfiguration. Never arms onto an open door.
    pub fn evaluate_auto_relock<O: LockObserver>(&mut self, now: I, sink: &mut O) {
        if !self.policy.enabled || self.state != LockState::UnlockingCompleted {
            return;
        }

        if self.policy.door_check_enabled
            && let Some(door) = self.door_state
        {
            match door {
                DoorState::Closed => self.arm_relock_timer(now, sink),
                DoorState::Open => {
                    if self.relock_deadline.take().is_some() {
                        sink.on_lock_event(LockEvent::RelockSuspended);
                    }
                }
            }
        } else {
            // Door check disabled or no sensor subscription: trust elapsed
            // time alone.
            self.arm_relock_timer(now, sink);
        }
    }

    fn arm_relock_timer<O: LockObserver>(&mut self, now: I, sink: &mut O) {
        if self.relock_deadline.is_some() {
            return;
        }

        let seconds = self.policy.duration_secs;
        self.relock_deadline = Some(now + Duration::from_secs(u64::from(seconds)));
        sink.on_lock_event(LockEvent::RelockArmed { seconds });
    }

    fn complete_actuation<O: LockObserver>(&mut self, now: I, sink: &mut O) {
        let completed = match self.state {
            LockState::LockingInitiated => {
                self.state = LockState::LockingCompleted;
                Some(LockAction::Lock)
            }
            LockState::UnlockingInitiated => {
                self.state = LockState::UnlockingCompleted;
                Some(LockAction::Unlock)
            }
            _ => None,
        };

        if let Some(action) = completed {
            sink.on_lock_event(LockEvent::ActionCompleted { action });

            if action == LockAction::Unlock {
                self.evaluate_auto_relock(now, sink);
            }
        }
    }
}

impl<I> Default for BoltLock<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new()
    }
}
