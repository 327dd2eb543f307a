//! Default timing and policy values for the lock application.
//!
//! These mirror the settings a deployment would push through persistent
//! configuration; everything here is a plain numeric or boolean value with no
//! dynamic schema.

use core::time::Duration;

/// Depth of the application event queue shared by all producers.
pub const APP_EVENT_QUEUE_SIZE: usize = 10;

/// Debounce window applied by the button driver before edges reach the app.
pub const BUTTON_DEBOUNCE_PERIOD: Duration = Duration::from_millis(50);

/// How long a button must stay pressed before a long press is recognized.
pub const LONG_PRESS_TIMEOUT: Duration = Duration::from_millis(3_000);

/// Time the simulated actuator takes to move the bolt between states.
pub const ACTUATOR_MOVEMENT_PERIOD: Duration = Duration::from_millis(2_000);

/// Hold duration on the function button that arms a factory reset.
pub const FACTORY_RESET_TRIGGER_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Window after arming during which releasing the button cancels the reset.
pub const FACTORY_RESET_CANCEL_WINDOW: Duration = Duration::from_millis(10_000);

/// Default auto-relock delay after a completed unlock.
pub const AUTO_LOCK_DURATION_SECS_DEFAULT: u32 = 10;

/// Whether auto-relock is active out of the box.
pub const AUTO_RELOCK_ENABLED_DEFAULT: bool = true;

/// Whether the door-sensor gate is consulted out of the box.
pub const DOOR_CHECK_ENABLED_DEFAULT: bool = true;

/// Bundle of the tunable durations consumed by the state machines.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    pub long_press_timeout: Duration,
    pub actuator_period: Duration,
    pub reset_trigger_timeout: Duration,
    pub reset_cancel_window: Duration,
}

impl Timing {
    /// Returns the factory-default timing set.
    pub const fn new() -> Self {
        Self {
            long_press_timeout: LONG_PRESS_TIMEOUT,
            actuator_period: ACTUATOR_MOVEMENT_PERIOD,
            reset_trigger_timeout: FACTORY_RESET_TRIGGER_TIMEOUT,
            reset_cancel_window: FACTORY_RESET_CANCEL_WINDOW,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}
