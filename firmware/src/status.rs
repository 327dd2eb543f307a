//! Shared status storage for the firmware target.
//!
//! Lightweight atomics cache the lock state, connectivity summary, and
//! factory-reset arming flag so producer tasks (network reporting, remote
//! reads) can answer queries without touching the application context.

use lock_core::indicator::ConnectivitySnapshot;
use lock_core::lock::LockState;
use portable_atomic::{AtomicBool, AtomicU8, Ordering};

const STATE_LOCKING_INITIATED: u8 = 0;
const STATE_LOCKING_COMPLETED: u8 = 1;
const STATE_UNLOCKING_INITIATED: u8 = 2;
const STATE_UNLOCKING_COMPLETED: u8 = 3;

/// Last lock state published by the application task.
static LOCK_STATE: AtomicU8 = AtomicU8::new(STATE_LOCKING_COMPLETED);
/// Whether the device currently has full service connectivity.
static FULLY_CONNECTED: AtomicBool = AtomicBool::new(false);
/// Whether a factory reset is armed and awaiting its cancel window.
static RESET_ARMED: AtomicBool = AtomicBool::new(false);

const fn encode_state(state: LockState) -> u8 {
    match state {
        LockState::LockingInitiated => STATE_LOCKING_INITIATED,
        LockState::LockingCompleted => STATE_LOCKING_COMPLETED,
        LockState::UnlockingInitiated => STATE_UNLOCKING_INITIATED,
        LockState::UnlockingCompleted => STATE_UNLOCKING_COMPLETED,
    }
}

const fn decode_state(encoded: u8) -> LockState {
    match encoded {
        STATE_LOCKING_INITIATED => LockState::LockingInitiated,
        STATE_UNLOCKING_INITIATED => LockState::UnlockingInitiated,
        STATE_UNLOCKING_COMPLETED => LockState::UnlockingCompleted,
        _ => LockState::LockingCompleted,
    }
}

/// Publishes the lock state for other tasks to read.
pub fn record_lock_state(state: LockState) {
    LOCK_STATE.store(encode_state(state), Ordering::Relaxed);
}

/// Returns the last published lock state.
pub fn lock_state() -> LockState {
    decode_state(LOCK_STATE.load(Ordering::Relaxed))
}

/// Publishes the connectivity summary derived from the latest sample.
pub fn record_connectivity(snapshot: &ConnectivitySnapshot) {
    FULLY_CONNECTED.store(snapshot.is_fully_connected(), Ordering::Relaxed);
}

/// Returns `true` when the last sample showed full service connectivity.
pub fn is_fully_connected() -> bool {
    FULLY_CONNECTED.load(Ordering::Relaxed)
}

/// Publishes whether a factory reset is armed.
pub fn record_reset_armed(armed: bool) {
    RESET_ARMED.store(armed, Ordering::Relaxed);
}

/// Returns `true` while a factory reset awaits its cancel window.
pub fn reset_armed() -> bool {
    RESET_ARMED.load(Ordering::Relaxed)
}
