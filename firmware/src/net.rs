//! Shared network-facing state and remote entry points.
//!
//! The connectivity stack runs in its own tasks; it publishes door-sensor and
//! connectivity updates into a mutex-guarded snapshot and posts application
//! events for anything that needs the consumer's attention. The application
//! task samples the snapshot opportunistically with `try_lock` so a busy
//! network task can never stall the event loop.

use embassy_sync::mutex::Mutex;

use lock_core::event::{Event, EventPayload, LockAction, LockActor};
use lock_core::indicator::ConnectivitySnapshot;
use lock_core::lock::DoorState;

use crate::app::{AppMutex, EventSender, post};

/// State owned by the connectivity stack and sampled by the application task.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NetState {
    pub connectivity: ConnectivitySnapshot,
    /// `None` until a door-sensor subscription is established.
    pub door: Option<DoorState>,
}

impl NetState {
    /// State before the stack has attached or subscribed to anything.
    pub const fn new() -> Self {
        Self {
            connectivity: ConnectivitySnapshot::new(),
            door: None,
        }
    }
}

/// Mutex guarding the network-owned state.
pub type SharedNetState = Mutex<AppMutex, NetState>;

/// Copy of the shared state taken during a successful sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NetSample {
    pub connectivity: ConnectivitySnapshot,
    pub door: Option<DoorState>,
}

/// Samples the shared state without waiting.
///
/// Returns `None` when the network stack holds the lock; the caller keeps its
/// cached copy for this turn.
pub fn try_sample(shared: &SharedNetState) -> Option<NetSample> {
    let guard = shared.try_lock().ok()?;
    Some(NetSample {
        connectivity: guard.connectivity,
        door: guard.door,
    })
}

/// Publishes a door-sensor update and asks the consumer to re-evaluate the
/// relock policy.
pub async fn publish_door_state(
    shared: &SharedNetState,
    sender: EventSender<'_>,
    door: Option<DoorState>,
) {
    shared.lock().await.door = door;
    post(sender, Event::new(EventPayload::AutoRelockEvaluate));
}

/// Publishes fresh connectivity booleans from the stack.
pub async fn publish_connectivity(shared: &SharedNetState, snapshot: ConnectivitySnapshot) {
    shared.lock().await.connectivity = snapshot;
}

/// Entry point for a remote lock or unlock method invocation.
///
/// Returns `false` when the event queue is saturated and the request was
/// dropped; the remote caller sees the device state unchanged.
pub fn request_remote_action(sender: EventSender<'_>, action: LockAction) -> bool {
    post(
        sender,
        Event::new(EventPayload::LockActionRequested {
            actor: LockActor::RemoteMethod,
            action,
        }),
    )
}

/// Announces that the pairing layer discovered a companion device.
pub fn announce_remote_device(sender: EventSender<'_>) -> bool {
    post(sender, Event::new(EventPayload::RemoteDeviceDiscovered))
}
