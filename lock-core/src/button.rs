//! Button gesture detection.
//!
//! Raw press/release edges arrive already debounced by the driver layer. This
//! module raises them into gestures (press, release, long press, long-press
//! release) using one deadline per button. Deadlines are detected by polling
//! from the application task's loop cadence rather than a hardware timer per
//! button, which bounds long-press latency to one loop period.

use core::ops::Add;
use core::time::Duration;

use heapless::Vec;

use crate::config::LONG_PRESS_TIMEOUT;

/// Logical identifier for a physical button.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonId(pub u8);

impl ButtonId {
    /// Slot index used by [`ButtonMonitor`].
    pub const fn as_index(self) -> usize {
        self.0 as usize
    }
}

/// Button wired to the factory-reset / update gesture.
pub const FUNCTION_BUTTON: ButtonId = ButtonId(0);
/// Button wired to lock/unlock requests.
pub const LOCK_BUTTON: ButtonId = ButtonId(1);
/// Button reserved for attention / pairing flows.
pub const ATTENTION_BUTTON: ButtonId = ButtonId(2);

/// Raw debounced edge reported by the button driver.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonEdge {
    Press,
    Release,
}

/// Derived, higher-level button interpretation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonGesture {
    Press,
    Release,
    LongPress,
    LongPressRelease,
}

/// Gesture notification delivered to button subscribers.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ButtonEvent {
    pub pin: ButtonId,
    pub gesture: ButtonGesture,
}

/// Handler invoked with the application context and a resolved gesture.
pub type ButtonHandler<Ctx> = fn(&mut Ctx, &ButtonEvent);

#[derive(Copy, Clone, Debug)]
struct ButtonSlot<I> {
    /// Pending long-press deadline; `Some` only while a short press is live.
    deadline: Option<I>,
    /// Set once the deadline fired; mutually exclusive with a live deadline.
    long_press_active: bool,
}

impl<I> ButtonSlot<I> {
    const fn new() -> Self {
        Self {
            deadline: None,
            long_press_active: false,
        }
    }
}

/// Tracks per-button gesture state for up to `N` buttons.
pub struct ButtonMonitor<I, const N: usize = 4> {
    slots: [ButtonSlot<I>; N],
    long_press_timeout: Duration,
}

impl<I, const N: usize> ButtonMonitor<I, N>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    /// Creates a monitor with the default long-press timeout.
    pub const fn new() -> Self {
        Self::with_timeout(LONG_PRESS_TIMEOUT)
    }

    /// Creates a monitor with an explicit long-press timeout.
    pub const fn with_timeout(long_press_timeout: Duration) -> Self {
        Self {
            slots: [ButtonSlot::new(); N],
            long_press_timeout,
        }
    }

    /// Updates the long-press timeout applied to subsequent presses.
    pub fn set_long_press_timeout(&mut self, timeout: Duration) {
        self.long_press_timeout = timeout;
    }

    /// Returns `true` while the button is held past its long-press deadline.
    pub fn is_long_press_active(&self, id: ButtonId) -> bool {
        self.slots
            .get(id.as_index())
            .is_some_and(|slot| slot.long_press_active)
    }

    /// Feeds a debounced edge into the per-button state machine.
    ///
    /// Returns the gesture to deliver, if the edge resolved one. Unknown
    /// button ids are ignored.
    pub fn handle_edge(&mut self, id: ButtonId, edge: ButtonEdge, now: I) -> Option<ButtonGesture> {
        let timeout = self.long_press_timeout;
        let slot = self.slots.get_mut(id.as_index())?;

        match edge {
            ButtonEdge::Press => {
                slot.deadline = Some(now + timeout);
                slot.long_press_active = false;
                Some(ButtonGesture::Press)
            }
            ButtonEdge::Release => {
                if slot.long_press_active {
                    slot.long_press_active = false;
                    Some(ButtonGesture::LongPressRelease)
                } else if slot.deadline.take().is_some() {
                    Some(ButtonGesture::Release)
                } else {
                    // Release without a tracked press (e.g. held across boot).
                    None
                }
            }
        }
    }

    /// Sweeps every button deadline against `now`.
    ///
    /// Returns the buttons whose long press activated during this sweep, in
    /// slot order; each gets a `LongPress` gesture delivered by the caller.
    pub fn poll(&mut self, now: I) -> Vec<ButtonId, N> {
        let mut activated = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(deadline) = slot.deadline
                && now >= deadline
            {
                slot.deadline = None;
                slot.long_press_active = true;
                let _ = activated.push(ButtonId(index as u8));
            }
        }
        activated
    }
}

impl<I, const N: usize> Default for ButtonMonitor<I, N>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    fn default() -> Self {
        Self::new()
    }
}
