//! Application context bridging firmware tasks with `lock-core`.

pub mod handlers;
pub mod task;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use embassy_time::{Duration as EmbassyDuration, Instant};

use lock_core::button::{ButtonEvent, ButtonGesture, ButtonHandler, ButtonId, ButtonMonitor};
use lock_core::config::{APP_EVENT_QUEUE_SIZE, Timing};
use lock_core::event::{Event, EventHandler, EventKind, EventPayload, HandlerRegistry};
use lock_core::function::{FunctionEvent, FunctionMachine};
use lock_core::indicator::{
    Blinker, ConnectivitySnapshot, IndicatorPattern, RESET_ARMING_PATTERN, lock_pattern,
    status_pattern,
};
use lock_core::lock::{BoltLock, DoorState};

use crate::audit::{AuditEventKind, AuditLog, AuditSink};
use crate::leds::IndicatorDriver;
use crate::net::NetSample;
use crate::status;

/// Maximum default-table registrations for application events.
pub const MAX_EVENT_HANDLERS: usize = 8;

/// Maximum gesture subscriptions across all buttons.
pub const MAX_BUTTON_HANDLERS: usize = 4;

// The host alias must still allow `static` queues (tests share one with the
// spawned-context pattern the runtime uses), so it needs a `Sync` raw mutex.
#[cfg(target_os = "none")]
pub type AppMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
pub type AppMutex = CriticalSectionRawMutex;

#[cfg(target_os = "none")]
pub type Indicators = crate::leds::GpioIndicators<'static>;
#[cfg(not(target_os = "none"))]
pub type Indicators = crate::leds::HostIndicators;

/// Monotonic timestamp used by every deadline in the application.
///
/// Wraps the Embassy instant so `lock-core`'s state machines, which are
/// generic over any ordered instant, can do arithmetic with `core` durations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    /// Captures the current monotonic time.
    pub fn now() -> Self {
        Self(Instant::now())
    }

    /// Returns the underlying Embassy instant.
    pub const fn into_embassy(self) -> Instant {
        self.0
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl core::ops::Add<core::time::Duration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: core::time::Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0 + EmbassyDuration::from_micros(micros))
    }
}

impl core::ops::Sub for FirmwareInstant {
    type Output = core::time::Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        core::time::Duration::from_micros(self.0.saturating_duration_since(rhs.0).as_micros())
    }
}

/// Event record carried by the application queue.
pub type AppEvent = Event<AppContext>;

/// Queue feeding the single-consumer application task.
pub type EventQueue = Channel<AppMutex, AppEvent, APP_EVENT_QUEUE_SIZE>;

/// Convenience sender type alias for the application event queue.
pub type EventSender<'a> = Sender<'a, AppMutex, AppEvent, APP_EVENT_QUEUE_SIZE>;

/// Convenience receiver type alias for the application event queue.
pub type EventReceiver<'a> = Receiver<'a, AppMutex, AppEvent, APP_EVENT_QUEUE_SIZE>;

/// Posts an event without blocking.
///
/// A full queue drops the event and logs the loss; producers never wait on the
/// consumer.
pub fn post(sender: EventSender<'_>, event: AppEvent) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            log_dropped_event(&event.payload);
            false
        }
    }
}

/// Single-consumer state owned by the application task.
///
/// Every field is mutated only from the task that drains the event queue;
/// producers in other tasks interact exclusively through the queue sender and
/// the shared network state.
pub struct AppContext {
    pub lock: BoltLock<FirmwareInstant>,
    pub buttons: ButtonMonitor<FirmwareInstant>,
    pub function: FunctionMachine<FirmwareInstant>,
    pub handlers: HandlerRegistry<EventKind, EventHandler<AppContext>, MAX_EVENT_HANDLERS>,
    pub button_handlers: HandlerRegistry<ButtonId, ButtonHandler<AppContext>, MAX_BUTTON_HANDLERS>,
    pub audit: AuditLog,
    pub connectivity: ConnectivitySnapshot,
    pub indicators: Indicators,
    status_blinker: Blinker<FirmwareInstant>,
    lock_blinker: Blinker<FirmwareInstant>,
    sender: EventSender<'static>,
    now: FirmwareInstant,
}

impl AppContext {
    /// Builds a context with the default dispatch table, gesture
    /// subscriptions, and factory timing.
    pub fn new(sender: EventSender<'static>, indicators: Indicators) -> Self {
        Self::with_timing(sender, indicators, Timing::new())
    }

    /// Builds a context whose state machines run on the given timing bundle.
    pub fn with_timing(
        sender: EventSender<'static>,
        indicators: Indicators,
        timing: Timing,
    ) -> Self {
        let mut ctx = Self {
            lock: BoltLock::with_actuator_period(timing.actuator_period),
            buttons: ButtonMonitor::with_timeout(timing.long_press_timeout),
            function: FunctionMachine::with_windows(
                timing.reset_trigger_timeout,
                timing.reset_cancel_window,
            ),
            handlers: HandlerRegistry::new(),
            button_handlers: HandlerRegistry::new(),
            audit: AuditLog::new(),
            connectivity: ConnectivitySnapshot::default(),
            indicators,
            status_blinker: Blinker::new(IndicatorPattern::Off),
            lock_blinker: Blinker::new(IndicatorPattern::On),
            sender,
            now: FirmwareInstant::from(Instant::from_micros(0)),
        };
        handlers::install_defaults(&mut ctx);
        status::record_lock_state(ctx.lock.state());
        ctx
    }

    /// Returns the timestamp captured at the top of the current loop turn.
    pub const fn now(&self) -> FirmwareInstant {
        self.now
    }

    /// Records the timestamp all subsequent dispatches observe.
    pub fn tick(&mut self, now: FirmwareInstant) {
        self.now = now;
    }

    /// Posts a follow-up event from within the consumer task.
    pub fn post(&self, event: AppEvent) -> bool {
        post(self.sender, event)
    }

    /// Delivers one event, preferring its bound handler over the default
    /// dispatch table.
    pub fn dispatch(&mut self, event: &AppEvent) {
        if let Some(handler) = event.handler {
            handler(self, &event.payload);
            return;
        }

        let snapshot = self.handlers.collect_matching(event.payload.kind());
        if snapshot.is_empty() {
            log_unhandled_event(&event.payload);
            return;
        }
        for handler in &snapshot {
            handler(self, &event.payload);
        }
    }

    /// Fans a resolved gesture out to the button subscriptions.
    pub fn deliver_gesture(&mut self, pin: ButtonId, gesture: ButtonGesture) {
        let event = ButtonEvent { pin, gesture };
        let snapshot = self.button_handlers.collect_matching(pin);
        for handler in &snapshot {
            handler(self, &event);
        }
    }

    /// Sweeps every deadline owned by the state machines against `now`.
    pub fn advance(&mut self, now: FirmwareInstant) {
        self.now = now;

        let activated = self.buttons.poll(now);
        for pin in activated {
            self.deliver_gesture(pin, ButtonGesture::LongPress);
        }

        self.poll_function();
        self.poll_lock();
    }

    /// Advances the bolt-lock deadlines, recording transitions to the audit
    /// ring and posting completion events.
    pub fn poll_lock(&mut self) {
        let mut sink = AuditSink::new(&mut self.audit, self.sender, self.now);
        self.lock.poll(self.now, &mut sink);
        status::record_lock_state(self.lock.state());
    }

    /// Advances the function-button windows against the current timestamp.
    pub fn poll_function(&mut self) {
        if let Some(event) = self.function.poll(self.now) {
            self.apply_function_event(event);
        }
    }

    /// Attempts a lock or unlock actuation and reports whether it started.
    pub fn request_lock_action(
        &mut self,
        actor: lock_core::event::LockActor,
        action: lock_core::event::LockAction,
    ) -> bool {
        let mut sink = AuditSink::new(&mut self.audit, self.sender, self.now);
        let accepted = self.lock.initiate_action(actor, action, self.now, &mut sink);
        if accepted {
            status::record_lock_state(self.lock.state());
        } else {
            log_rejected_action(action);
        }
        accepted
    }

    /// Re-runs the auto-relock policy decision.
    pub fn evaluate_relock(&mut self) {
        let mut sink = AuditSink::new(&mut self.audit, self.sender, self.now);
        self.lock.evaluate_auto_relock(self.now, &mut sink);
    }

    /// Records a door-sensor update and lets the lock re-evaluate.
    pub fn set_door_state(&mut self, door: Option<DoorState>) {
        let mut sink = AuditSink::new(&mut self.audit, self.sender, self.now);
        self.lock.set_door_state(door, self.now, &mut sink);
    }

    /// Applies an outcome of the function-button gesture machine.
    pub fn apply_function_event(&mut self, event: FunctionEvent) {
        let kind = match event {
            FunctionEvent::UpdateCheckRequested => {
                // Hook for the OTA collaborator; the request itself goes
                // through the queue so remote observers see it too.
                self.post(Event::new(EventPayload::InstallRequested));
                AuditEventKind::UpdateCheckRequested
            }
            FunctionEvent::ResetArmed => AuditEventKind::ResetArmed,
            FunctionEvent::ResetCancelled => AuditEventKind::ResetCancelled,
            FunctionEvent::FactoryReset => AuditEventKind::FactoryReset,
        };
        self.audit.record(kind, self.now);
        status::record_reset_armed(self.function.reset_indicated());

        if event == FunctionEvent::FactoryReset {
            perform_factory_reset();
        }
    }

    /// Folds a sampled network snapshot into the cached copies.
    ///
    /// Called with the most recent successful sample; when the shared state is
    /// contended the previous cache simply stays in effect for this turn.
    pub fn apply_net_sample(&mut self, sample: NetSample) {
        self.connectivity = sample.connectivity;
        status::record_connectivity(&self.connectivity);
        if sample.door != self.lock.door_state() {
            self.set_door_state(sample.door);
        }
    }

    /// Recomputes both indicator patterns and drives the outputs.
    ///
    /// The factory-reset arming blink overrides the lock indicator so both
    /// LEDs flash in unison while a reset is pending, and keeps flashing once
    /// the reset commits until the device restarts.
    pub fn refresh_indicators(&mut self, now: FirmwareInstant) {
        let reset_indicated = self.function.reset_indicated();
        self.status_blinker
            .apply(status_pattern(&self.connectivity, reset_indicated), now);
        let lock_led = if reset_indicated {
            RESET_ARMING_PATTERN
        } else {
            lock_pattern(self.lock.state())
        };
        self.lock_blinker.apply(lock_led, now);

        let status_level = self.status_blinker.level(now);
        let lock_level = self.lock_blinker.level(now);
        self.indicators.set_status(status_level);
        self.indicators.set_lock(lock_level);
    }
}

/// Wipes the device after a committed factory reset.
///
/// On hardware this never returns; persistent state is abandoned and the
/// system restarts through the reset vector. The host build only logs so the
/// terminal state stays observable.
#[cfg(target_os = "none")]
fn perform_factory_reset() {
    defmt::info!("app: factory reset committed, restarting");
    cortex_m::peripheral::SCB::sys_reset()
}

#[cfg(not(target_os = "none"))]
fn perform_factory_reset() {
    println!("app: factory reset committed, restarting");
}

#[cfg(target_os = "none")]
fn log_dropped_event(payload: &EventPayload) {
    defmt::warn!("app: event queue full, dropping {}", payload_label(payload));
}

#[cfg(not(target_os = "none"))]
fn log_dropped_event(payload: &EventPayload) {
    println!("app: event queue full, dropping {}", payload_label(payload));
}

#[cfg(target_os = "none")]
fn log_unhandled_event(payload: &EventPayload) {
    defmt::warn!("app: no handler registered for {}", payload_label(payload));
}

#[cfg(not(target_os = "none"))]
fn log_unhandled_event(payload: &EventPayload) {
    println!("app: no handler registered for {}", payload_label(payload));
}

#[cfg(target_os = "none")]
fn log_rejected_action(action: lock_core::event::LockAction) {
    defmt::warn!("lock: {} rejected, actuation in progress", action_label(action));
}

#[cfg(not(target_os = "none"))]
fn log_rejected_action(action: lock_core::event::LockAction) {
    println!("lock: {} rejected, actuation in progress", action_label(action));
}

const fn payload_label(payload: &EventPayload) -> &'static str {
    match payload {
        EventPayload::ButtonEdge { .. } => "button-edge",
        EventPayload::TimerExpired { .. } => "timer-expired",
        EventPayload::LockActionRequested { .. } => "lock-action-requested",
        EventPayload::LockActionInitiated { .. } => "lock-action-initiated",
        EventPayload::LockActionCompleted { .. } => "lock-action-completed",
        EventPayload::RemoteDeviceDiscovered => "remote-device-discovered",
        EventPayload::AutoRelockEvaluate => "auto-relock-evaluate",
        EventPayload::InstallRequested => "install-requested",
    }
}

pub(crate) const fn action_label(action: lock_core::event::LockAction) -> &'static str {
    match action {
        lock_core::event::LockAction::Lock => "lock",
        lock_core::event::LockAction::Unlock => "unlock",
    }
}
