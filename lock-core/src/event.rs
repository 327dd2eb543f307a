//! Application event model and handler registries.
//!
//! Every asynchronous input (button edge, timer expiry, remote request) is
//! funneled into a single typed event record that the application task consumes
//! in order. Handlers are plain function pointers taking the owning context as
//! an explicit parameter, so producers never reach through globals and the
//! registries can compare registrations by identity.

use heapless::Vec;

use crate::button::{ButtonEdge, ButtonId};

/// Identity attached to a lock-action request; audit-only, never consulted by
/// the state machine's transition table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockActor {
    /// A human pressing the physical lock button.
    PhysicalButton,
    /// A remote command arriving over the network stack.
    RemoteMethod,
    /// The device itself, acting on policy (auto-relock).
    LocalImplicit,
}

/// Direction of a bolt actuation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockAction {
    Lock,
    Unlock,
}

/// Logical timers whose expiry may be reported through the event queue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerId {
    LockActuator,
    AutoRelock,
    FunctionButton,
}

/// Payload of an application event.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventPayload {
    ButtonEdge { pin: ButtonId, action: ButtonEdge },
    TimerExpired { timer: TimerId },
    LockActionRequested { actor: LockActor, action: LockAction },
    LockActionInitiated { actor: LockActor, action: LockAction },
    LockActionCompleted { action: LockAction },
    RemoteDeviceDiscovered,
    AutoRelockEvaluate,
    InstallRequested,
}

/// Tag used when consulting the default dispatch table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventKind {
    ButtonEdge,
    TimerExpired,
    LockActionRequested,
    LockActionInitiated,
    LockActionCompleted,
    RemoteDeviceDiscovered,
    AutoRelockEvaluate,
    InstallRequested,
}

impl EventPayload {
    /// Returns the dispatch tag for this payload.
    pub const fn kind(&self) -> EventKind {
        match self {
            EventPayload::ButtonEdge { .. } => EventKind::ButtonEdge,
            EventPayload::TimerExpired { .. } => EventKind::TimerExpired,
            EventPayload::LockActionRequested { .. } => EventKind::LockActionRequested,
            EventPayload::LockActionInitiated { .. } => EventKind::LockActionInitiated,
            EventPayload::LockActionCompleted { .. } => EventKind::LockActionCompleted,
            EventPayload::RemoteDeviceDiscovered => EventKind::RemoteDeviceDiscovered,
            EventPayload::AutoRelockEvaluate => EventKind::AutoRelockEvaluate,
            EventPayload::InstallRequested => EventKind::InstallRequested,
        }
    }
}

/// Handler invoked with the application context and the event payload.
pub type EventHandler<Ctx> = fn(&mut Ctx, &EventPayload);

/// Event record carried by the application queue.
///
/// A producer may bind an explicit handler; otherwise the consumer falls back
/// to the default table keyed by [`EventKind`]. The record is copied by value
/// into the queue and owned by the consumer afterwards.
pub struct Event<Ctx> {
    pub payload: EventPayload,
    pub handler: Option<EventHandler<Ctx>>,
}

// Manual impls keep `Ctx` free of bounds it never needs.
impl<Ctx> core::fmt::Debug for Event<Ctx> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Event")
            .field("payload", &self.payload)
            .field("bound_handler", &self.handler.is_some())
            .finish()
    }
}

impl<Ctx> Event<Ctx> {
    /// Creates an event dispatched through the default table.
    pub const fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            handler: None,
        }
    }

    /// Creates an event bound to an explicit handler.
    pub const fn with_handler(payload: EventPayload, handler: EventHandler<Ctx>) -> Self {
        Self {
            payload,
            handler: Some(handler),
        }
    }
}

impl<Ctx> Clone for Event<Ctx> {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload,
            handler: self.handler,
        }
    }
}

impl<Ctx> Copy for Event<Ctx> {}

/// Errors reported while managing a handler registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegistryError {
    /// The registry has reached its fixed capacity.
    RegistryFull,
}

/// Ordered collection of `(filter key, handler)` registrations.
///
/// Entries keep insertion order, duplicates (same key and handler identity)
/// are suppressed, and removal is by the same value equality. Dispatch runs
/// over a snapshot so a handler may add or remove registrations without
/// corrupting an in-progress iteration.
pub struct HandlerRegistry<K, H, const CAP: usize> {
    entries: Vec<(K, H), CAP>,
}

impl<K, H, const CAP: usize> HandlerRegistry<K, H, CAP>
where
    K: Copy + PartialEq,
    H: Copy + PartialEq,
{
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers a handler for the given key.
    ///
    /// Registering an identical `(key, handler)` pair again is a no-op.
    pub fn add(&mut self, key: K, handler: H) -> Result<(), RegistryError> {
        if self.contains(key, handler) {
            return Ok(());
        }

        self.entries
            .push((key, handler))
            .map_err(|_| RegistryError::RegistryFull)
    }

    /// Removes every registration matching the key and handler identity.
    pub fn remove(&mut self, key: K, handler: H) {
        self.entries
            .retain(|(entry_key, entry_handler)| !(*entry_key == key && *entry_handler == handler));
    }

    /// Returns `true` when the exact registration is present.
    pub fn contains(&self, key: K, handler: H) -> bool {
        self.entries
            .iter()
            .any(|(entry_key, entry_handler)| *entry_key == key && *entry_handler == handler)
    }

    /// Copies the handlers registered for `key`, in registration order, into a
    /// stable snapshot the caller can iterate while mutating the registry.
    pub fn collect_matching(&self, key: K) -> Vec<H, CAP> {
        let mut snapshot = Vec::new();
        for (entry_key, handler) in &self.entries {
            if *entry_key == key {
                // Snapshot capacity equals registry capacity; push cannot fail.
                let _ = snapshot.push(*handler);
            }
        }
        snapshot
    }

    /// Returns the number of registrations stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no registrations are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, H, const CAP: usize> Default for HandlerRegistry<K, H, CAP>
where
    K: Copy + PartialEq,
    H: Copy + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}
