//! Audit ring buffer and logging helpers.
//!
//! Records every lock transition and factory-reset milestone into a
//! fixed-capacity ring with timestamps, and mirrors them to defmt / stdout so
//! field units and the host harness share one trail. The ring is owned by the
//! application task; nothing else writes to it.

use heapless::HistoryBuf;

use lock_core::event::{Event, EventPayload, LockAction, LockActor};
use lock_core::lock::{LockEvent, LockObserver};

use crate::app::{EventSender, FirmwareInstant, action_label};

/// Total number of audit entries retained in memory.
pub const AUDIT_RING_CAPACITY: usize = 64;

/// Audit ring buffer type alias.
pub type AuditRing = HistoryBuf<AuditRecord, AUDIT_RING_CAPACITY>;

/// Milestones recorded in the audit trail.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuditEventKind {
    ActionInitiated { action: LockAction, actor: LockActor },
    ActionCompleted { action: LockAction },
    RelockArmed { seconds: u32 },
    RelockSuspended,
    RelockTriggered,
    UpdateCheckRequested,
    ResetArmed,
    ResetCancelled,
    FactoryReset,
}

/// Audit record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AuditRecord {
    pub id: u32,
    pub timestamp: FirmwareInstant,
    pub event: AuditEventKind,
}

/// Fixed-size audit trail with monotonically increasing record ids.
pub struct AuditLog {
    ring: AuditRing,
    next_id: u32,
}

impl AuditLog {
    /// Creates an audit log with an empty history.
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_id: 0,
        }
    }

    /// Returns an iterator over the records in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &AuditRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent record, if any.
    pub fn latest(&self) -> Option<&AuditRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Appends a record and emits the matching log line.
    pub fn record(&mut self, event: AuditEventKind, timestamp: FirmwareInstant) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.ring.write(AuditRecord {
            id,
            timestamp,
            event,
        });
        log_audit_event(&event, timestamp);

        id
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer wiring [`LockEvent`] notifications into the audit trail and the
/// event queue.
///
/// Initiations and completions are re-posted as application events so default
/// handlers (status cache, remote reporting) observe them in queue order.
pub struct AuditSink<'a> {
    log: &'a mut AuditLog,
    sender: EventSender<'static>,
    now: FirmwareInstant,
}

impl<'a> AuditSink<'a> {
    pub fn new(log: &'a mut AuditLog, sender: EventSender<'static>, now: FirmwareInstant) -> Self {
        Self { log, sender, now }
    }
}

impl LockObserver for AuditSink<'_> {
    fn on_lock_event(&mut self, event: LockEvent) {
        let kind = match event {
            LockEvent::ActionInitiated { action, actor } => {
                crate::app::post(
                    self.sender,
                    Event::new(EventPayload::LockActionInitiated { actor, action }),
                );
                AuditEventKind::ActionInitiated { action, actor }
            }
            LockEvent::ActionCompleted { action } => {
                crate::app::post(
                    self.sender,
                    Event::new(EventPayload::LockActionCompleted { action }),
                );
                AuditEventKind::ActionCompleted { action }
            }
            LockEvent::RelockArmed { seconds } => AuditEventKind::RelockArmed { seconds },
            LockEvent::RelockSuspended => AuditEventKind::RelockSuspended,
            LockEvent::RelockTriggered => AuditEventKind::RelockTriggered,
        };
        self.log.record(kind, self.now);
    }
}

fn log_audit_event(event: &AuditEventKind, timestamp: FirmwareInstant) {
    let timestamp_ms = timestamp.into_embassy().as_millis();
    match event {
        AuditEventKind::ActionInitiated { action, actor } => {
            emit_log("initiated", action_label(*action), actor_label(*actor), timestamp_ms);
        }
        AuditEventKind::ActionCompleted { action } => {
            emit_log("completed", action_label(*action), "-", timestamp_ms);
        }
        AuditEventKind::RelockArmed { .. } => emit_log("relock", "armed", "-", timestamp_ms),
        AuditEventKind::RelockSuspended => emit_log("relock", "suspended", "-", timestamp_ms),
        AuditEventKind::RelockTriggered => emit_log("relock", "triggered", "-", timestamp_ms),
        AuditEventKind::UpdateCheckRequested => {
            emit_log("function", "update-check", "-", timestamp_ms);
        }
        AuditEventKind::ResetArmed => emit_log("function", "reset-armed", "-", timestamp_ms),
        AuditEventKind::ResetCancelled => emit_log("function", "reset-cancelled", "-", timestamp_ms),
        AuditEventKind::FactoryReset => emit_log("function", "factory-reset", "-", timestamp_ms),
    }
}

#[cfg(target_os = "none")]
fn emit_log(scope: &'static str, what: &'static str, who: &'static str, timestamp_ms: u64) {
    defmt::info!("audit:{} {} by={} t={}ms", scope, what, who, timestamp_ms);
}

#[cfg(not(target_os = "none"))]
fn emit_log(scope: &'static str, what: &'static str, who: &'static str, timestamp_ms: u64) {
    println!("audit:{scope} {what} by={who} t={timestamp_ms}ms");
}

const fn actor_label(actor: LockActor) -> &'static str {
    match actor {
        LockActor::PhysicalButton => "button",
        LockActor::RemoteMethod => "remote",
        LockActor::LocalImplicit => "auto",
    }
}
