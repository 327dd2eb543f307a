//! Connectivity snapshot and indicator pattern policy.
//!
//! The application task samples connectivity booleans from the networking
//! stack each loop iteration and maps them, together with the lock and
//! factory-reset state, onto blink patterns. The actual LED hardware is an
//! external collaborator; this module only decides the pattern and computes
//! the on/off level for a given instant.

use core::ops::{Add, Sub};
use core::time::Duration;

use crate::lock::LockState;

/// Connectivity booleans sampled from the networking collaborator.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnectivitySnapshot {
    pub thread_provisioned: bool,
    pub thread_enabled: bool,
    pub thread_attached: bool,
    pub paired_to_account: bool,
    pub have_ble_connections: bool,
    pub have_service_connectivity: bool,
    pub service_subscriptions_established: bool,
}

impl ConnectivitySnapshot {
    /// Snapshot for a device that has not reached the network at all.
    pub const fn new() -> Self {
        Self {
            thread_provisioned: false,
            thread_enabled: false,
            thread_attached: false,
            paired_to_account: false,
            have_ble_connections: false,
            have_service_connectivity: false,
            service_subscriptions_established: false,
        }
    }

    /// The system is "fully connected" when it has service connectivity and
    /// can interact with the service on a regular basis.
    pub const fn is_fully_connected(&self) -> bool {
        self.have_service_connectivity && self.service_subscriptions_established
    }
}

/// Drive pattern for a single indicator.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IndicatorPattern {
    On,
    Off,
    Blink { on_ms: u32, off_ms: u32 },
}

/// Blink used by every indicator while a factory reset is armed.
pub const RESET_ARMING_PATTERN: IndicatorPattern = IndicatorPattern::Blink {
    on_ms: 100,
    off_ms: 100,
};

/// Maps connectivity state onto the status indicator pattern.
///
/// An armed factory reset overrides everything with the synchronized arming
/// blink. Otherwise: solid while fully connected; short off blips while
/// provisioned and paired but not yet attached or subscribed; an even 500 ms
/// blink while provisioned but unpaired; a fast 100 ms blink with BLE
/// connections but no provisioning; otherwise a short on blip.
pub fn status_pattern(snapshot: &ConnectivitySnapshot, reset_armed: bool) -> IndicatorPattern {
    if reset_armed {
        RESET_ARMING_PATTERN
    } else if snapshot.is_fully_connected() {
        IndicatorPattern::On
    } else if snapshot.thread_provisioned
        && snapshot.thread_enabled
        && snapshot.paired_to_account
        && (!snapshot.thread_attached
            || !snapshot.have_service_connectivity
            || !snapshot.service_subscriptions_established)
    {
        IndicatorPattern::Blink {
            on_ms: 950,
            off_ms: 50,
        }
    } else if snapshot.thread_provisioned && !snapshot.paired_to_account {
        IndicatorPattern::Blink {
            on_ms: 500,
            off_ms: 500,
        }
    } else if snapshot.have_ble_connections && !snapshot.thread_provisioned {
        IndicatorPattern::Blink {
            on_ms: 100,
            off_ms: 100,
        }
    } else {
        IndicatorPattern::Blink {
            on_ms: 50,
            off_ms: 950,
        }
    }
}

/// Maps the bolt state onto the lock indicator pattern: solid while locked,
/// off while unlocked, a rapid blink while an actuation is in flight.
pub const fn lock_pattern(state: LockState) -> IndicatorPattern {
    match state {
        LockState::LockingInitiated | LockState::UnlockingInitiated => IndicatorPattern::Blink {
            on_ms: 50,
            off_ms: 50,
        },
        LockState::LockingCompleted => IndicatorPattern::On,
        LockState::UnlockingCompleted => IndicatorPattern::Off,
    }
}

/// Computes the on/off level for an indicator over time.
///
/// Changing the pattern resets the blink phase so a new pattern always starts
/// with its on-interval.
pub struct Blinker<I> {
    pattern: IndicatorPattern,
    phase_start: Option<I>,
}

impl<I> Blinker<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<I, Output = Duration>,
{
    /// Creates a blinker holding the given initial pattern.
    pub const fn new(pattern: IndicatorPattern) -> Self {
        Self {
            pattern,
            phase_start: None,
        }
    }

    /// Returns the active pattern.
    pub const fn pattern(&self) -> IndicatorPattern {
        self.pattern
    }

    /// Applies a pattern, restarting the phase when it differs.
    pub fn apply(&mut self, pattern: IndicatorPattern, now: I) {
        if self.pattern != pattern {
            self.pattern = pattern;
            self.phase_start = Some(now);
        }
    }

    /// Returns the level the indicator should show at `now`.
    pub fn level(&mut self, now: I) -> bool {
        match self.pattern {
            IndicatorPattern::On => true,
            IndicatorPattern::Off => false,
            IndicatorPattern::Blink { on_ms, off_ms } => {
                let start = *self.phase_start.get_or_insert(now);
                let period = u64::from(on_ms) + u64::from(off_ms);
                if period == 0 {
                    return true;
                }
                let elapsed_ms = (now - start).as_millis() as u64;
                elapsed_ms % period < u64::from(on_ms)
            }
        }
    }
}
