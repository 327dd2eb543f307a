//! Default event dispatch table and gesture subscriptions.
//!
//! Producers usually post events without a bound handler; these functions are
//! what the consumer falls back to. Everything here runs on the application
//! task with exclusive access to the context.

use lock_core::button::{
    ATTENTION_BUTTON, ButtonEvent, ButtonGesture, FUNCTION_BUTTON, LOCK_BUTTON,
};
use lock_core::event::{Event, EventKind, EventPayload, LockAction, LockActor, TimerId};

use super::AppContext;
use crate::status;

/// Installs the default dispatch table and the stock button subscriptions.
pub fn install_defaults(ctx: &mut AppContext) {
    // Registry capacities are sized for every default registration, so the
    // adds cannot fail.
    let _ = ctx.handlers.add(EventKind::ButtonEdge, on_button_edge);
    let _ = ctx.handlers.add(EventKind::TimerExpired, on_timer_expired);
    let _ = ctx
        .handlers
        .add(EventKind::LockActionRequested, on_lock_action_requested);
    let _ = ctx
        .handlers
        .add(EventKind::LockActionInitiated, on_lock_action_initiated);
    let _ = ctx
        .handlers
        .add(EventKind::LockActionCompleted, on_lock_action_completed);
    let _ = ctx
        .handlers
        .add(EventKind::RemoteDeviceDiscovered, on_remote_device_discovered);
    let _ = ctx
        .handlers
        .add(EventKind::AutoRelockEvaluate, on_auto_relock_evaluate);
    let _ = ctx
        .handlers
        .add(EventKind::InstallRequested, on_install_requested);

    let _ = ctx.button_handlers.add(LOCK_BUTTON, on_lock_button);
    let _ = ctx.button_handlers.add(FUNCTION_BUTTON, on_function_button);
    let _ = ctx
        .button_handlers
        .add(ATTENTION_BUTTON, on_attention_button);
}

/// Raises a debounced edge into a gesture and fans it out.
fn on_button_edge(ctx: &mut AppContext, payload: &EventPayload) {
    if let EventPayload::ButtonEdge { pin, action } = payload {
        let now = ctx.now();
        if let Some(gesture) = ctx.buttons.handle_edge(*pin, *action, now) {
            ctx.deliver_gesture(*pin, gesture);
        }
    }
}

/// Releasing the lock button toggles the bolt, however long it was held.
fn on_lock_button(ctx: &mut AppContext, event: &ButtonEvent) {
    if !matches!(
        event.gesture,
        ButtonGesture::Release | ButtonGesture::LongPressRelease
    ) {
        return;
    }
    // While a factory-reset gesture is in flight every other button is inert.
    if ctx.function.is_engaged() {
        return;
    }

    let action = if ctx.lock.is_unlocked() {
        LockAction::Lock
    } else {
        LockAction::Unlock
    };
    ctx.post(Event::new(EventPayload::LockActionRequested {
        actor: LockActor::PhysicalButton,
        action,
    }));
}

/// Feeds function-button gestures into the factory-reset arming machine.
fn on_function_button(ctx: &mut AppContext, event: &ButtonEvent) {
    let now = ctx.now();
    let outcome = match event.gesture {
        ButtonGesture::Press => ctx.function.handle_press(now),
        ButtonGesture::Release | ButtonGesture::LongPressRelease => {
            ctx.function.handle_release(now)
        }
        ButtonGesture::LongPress => None,
    };
    if let Some(outcome) = outcome {
        ctx.apply_function_event(outcome);
    }
}

/// A press on the attention button asks the service to surface the device.
fn on_attention_button(ctx: &mut AppContext, event: &ButtonEvent) {
    if event.gesture != ButtonGesture::Press || ctx.function.is_engaged() {
        return;
    }
    log_attention_requested();
}

fn on_timer_expired(ctx: &mut AppContext, payload: &EventPayload) {
    if let EventPayload::TimerExpired { timer } = payload {
        match timer {
            TimerId::LockActuator | TimerId::AutoRelock => ctx.poll_lock(),
            TimerId::FunctionButton => ctx.poll_function(),
        }
    }
}

fn on_lock_action_requested(ctx: &mut AppContext, payload: &EventPayload) {
    if let EventPayload::LockActionRequested { actor, action } = payload {
        let _ = ctx.request_lock_action(*actor, *action);
    }
}

/// The bolt started moving; show the in-flight blink immediately rather than
/// waiting for the next loop turn.
fn on_lock_action_initiated(ctx: &mut AppContext, _payload: &EventPayload) {
    let now = ctx.now();
    ctx.refresh_indicators(now);
}

fn on_lock_action_completed(ctx: &mut AppContext, _payload: &EventPayload) {
    status::record_lock_state(ctx.lock.state());
    let now = ctx.now();
    ctx.refresh_indicators(now);
}

fn on_remote_device_discovered(_ctx: &mut AppContext, _payload: &EventPayload) {
    log_remote_device_discovered();
}

fn on_auto_relock_evaluate(ctx: &mut AppContext, _payload: &EventPayload) {
    ctx.evaluate_relock();
}

/// Hook for the software-update collaborator; the check itself runs outside
/// the coordinator.
fn on_install_requested(_ctx: &mut AppContext, _payload: &EventPayload) {
    log_install_requested();
}

#[cfg(target_os = "none")]
fn log_attention_requested() {
    defmt::info!("app: attention requested, signalling pairing surface");
}

#[cfg(not(target_os = "none"))]
fn log_attention_requested() {
    println!("app: attention requested, signalling pairing surface");
}

#[cfg(target_os = "none")]
fn log_remote_device_discovered() {
    defmt::info!("net: remote device discovered");
}

#[cfg(not(target_os = "none"))]
fn log_remote_device_discovered() {
    println!("net: remote device discovered");
}

#[cfg(target_os = "none")]
fn log_install_requested() {
    defmt::info!("app: software update check requested");
}

#[cfg(not(target_os = "none"))]
fn log_install_requested() {
    println!("app: software update check requested");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;

    use crate::app::{AppContext, EventQueue, FirmwareInstant};
    use crate::leds::HostIndicators;
    use embassy_sync::channel::Channel;
    use embassy_time::Instant;
    use lock_core::button::ButtonEdge;
    use lock_core::config::Timing;
    use lock_core::function::FunctionState;
    use lock_core::lock::LockState;

    fn at_millis(value: u64) -> FirmwareInstant {
        FirmwareInstant::from(Instant::from_millis(value))
    }

    fn drain_into(ctx: &mut AppContext, queue: &'static EventQueue) {
        while let Ok(event) = queue.try_receive() {
            ctx.dispatch(&event);
        }
    }

    #[test]
    fn lock_button_release_unlocks_a_locked_bolt() {
        static QUEUE: EventQueue = Channel::new();
        let mut ctx = AppContext::new(QUEUE.sender(), HostIndicators::default());
        ctx.tick(at_millis(0));

        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: LOCK_BUTTON,
            action: ButtonEdge::Press,
        }));
        // Pressing alone moves nothing; the bolt acts on the release.
        assert!(QUEUE.try_receive().is_err());
        assert_eq!(ctx.lock.state(), LockState::LockingCompleted);

        ctx.tick(at_millis(100));
        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: LOCK_BUTTON,
            action: ButtonEdge::Release,
        }));
        // The release posts a request; the next drain executes it.
        drain_into(&mut ctx, &QUEUE);

        assert_eq!(ctx.lock.state(), LockState::UnlockingInitiated);

        // The initiation repost is consumed without further effects.
        drain_into(&mut ctx, &QUEUE);
        assert_eq!(ctx.lock.state(), LockState::UnlockingInitiated);
    }

    #[test]
    fn lock_button_is_inert_while_reset_gesture_is_engaged() {
        static QUEUE: EventQueue = Channel::new();
        let mut ctx = AppContext::new(QUEUE.sender(), HostIndicators::default());
        ctx.tick(at_millis(0));

        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: FUNCTION_BUTTON,
            action: ButtonEdge::Press,
        }));
        assert_eq!(ctx.function.state(), FunctionState::ArmedForUpdate);

        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: LOCK_BUTTON,
            action: ButtonEdge::Press,
        }));
        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: LOCK_BUTTON,
            action: ButtonEdge::Release,
        }));
        assert!(QUEUE.try_receive().is_err());
        assert_eq!(ctx.lock.state(), LockState::LockingCompleted);
    }

    #[test]
    fn holding_function_button_through_both_windows_resets() {
        static QUEUE: EventQueue = Channel::new();
        let mut ctx = AppContext::new(QUEUE.sender(), HostIndicators::default());
        ctx.tick(at_millis(0));

        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: FUNCTION_BUTTON,
            action: ButtonEdge::Press,
        }));

        ctx.advance(at_millis(5_000));
        assert!(ctx.function.reset_armed());

        ctx.advance(at_millis(15_000));
        assert_eq!(ctx.function.state(), FunctionState::FactoryReset);
        assert!(
            ctx.audit
                .oldest_first()
                .any(|record| record.event == crate::audit::AuditEventKind::FactoryReset)
        );
    }

    #[test]
    fn short_function_press_requests_update_check() {
        static QUEUE: EventQueue = Channel::new();
        let mut ctx = AppContext::new(QUEUE.sender(), HostIndicators::default());
        ctx.tick(at_millis(0));

        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: FUNCTION_BUTTON,
            action: ButtonEdge::Press,
        }));
        ctx.tick(at_millis(1_000));
        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: FUNCTION_BUTTON,
            action: ButtonEdge::Release,
        }));

        let event = QUEUE.try_receive().unwrap();
        assert_eq!(event.payload, EventPayload::InstallRequested);
    }

    #[test]
    fn custom_timing_shortens_the_gesture_windows() {
        static QUEUE: EventQueue = Channel::new();
        let timing = Timing {
            long_press_timeout: Duration::from_millis(200),
            actuator_period: Duration::from_millis(100),
            reset_trigger_timeout: Duration::from_millis(400),
            reset_cancel_window: Duration::from_millis(600),
        };
        let mut ctx = AppContext::with_timing(QUEUE.sender(), HostIndicators::default(), timing);
        ctx.tick(at_millis(0));

        ctx.dispatch(&Event::new(EventPayload::ButtonEdge {
            pin: FUNCTION_BUTTON,
            action: ButtonEdge::Press,
        }));
        ctx.advance(at_millis(400));
        assert!(ctx.function.reset_armed());

        ctx.advance(at_millis(1_000));
        assert_eq!(ctx.function.state(), FunctionState::FactoryReset);
    }

    #[test]
    fn explicit_handler_preempts_the_default_table() {
        static QUEUE: EventQueue = Channel::new();
        fn custom(ctx: &mut AppContext, _payload: &EventPayload) {
            ctx.lock.set_auto_relock_enabled(false);
        }

        let mut ctx = AppContext::new(QUEUE.sender(), HostIndicators::default());
        ctx.tick(at_millis(0));

        ctx.dispatch(&Event::with_handler(
            EventPayload::AutoRelockEvaluate,
            custom,
        ));
        assert!(!ctx.lock.policy().enabled);
    }

    #[test]
    fn queue_overflow_drops_the_newest_event() {
        static QUEUE: EventQueue = Channel::new();
        let sender = QUEUE.sender();

        for _ in 0..10 {
            assert!(crate::app::post(
                sender,
                Event::new(EventPayload::AutoRelockEvaluate)
            ));
        }
        assert!(!crate::app::post(
            sender,
            Event::new(EventPayload::InstallRequested)
        ));

        // The ten oldest survive untouched.
        let mut count = 0;
        while let Ok(event) = QUEUE.try_receive() {
            assert_eq!(event.payload, EventPayload::AutoRelockEvaluate);
            count += 1;
        }
        assert_eq!(count, 10);
    }
}
