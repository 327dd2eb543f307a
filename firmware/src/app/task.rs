//! Application event loop.
//!
//! A single task drains the event queue and owns every state machine. Each
//! turn waits up to one loop period for an event, drains whatever else is
//! queued, then sweeps deadlines, samples the network snapshot, and refreshes
//! the indicators. Timer resolution is therefore bounded by the loop period,
//! not by per-deadline hardware timers.

use embassy_futures::select::{Either, select};
use embassy_time::{Duration as EmbassyDuration, Timer};

use super::{AppContext, EventReceiver, FirmwareInstant};
use crate::net::{self, SharedNetState};
use crate::status;

/// Upper bound on how long one loop turn blocks waiting for an event.
pub const EVENT_WAIT_PERIOD: EmbassyDuration = EmbassyDuration::from_millis(10);

/// Runs the application loop forever.
pub async fn run(receiver: EventReceiver<'_>, shared: &SharedNetState, mut ctx: AppContext) -> ! {
    loop {
        if let Either::First(event) = select(receiver.receive(), Timer::after(EVENT_WAIT_PERIOD)).await
        {
            ctx.tick(FirmwareInstant::now());
            ctx.dispatch(&event);
            drain(receiver, &mut ctx);
        }
        turn(&mut ctx, shared, FirmwareInstant::now());
    }
}

/// Dispatches every event already sitting in the queue.
fn drain(receiver: EventReceiver<'_>, ctx: &mut AppContext) {
    while let Ok(event) = receiver.try_receive() {
        ctx.dispatch(&event);
    }
}

/// One synchronous loop turn: sample, sweep deadlines, refresh outputs.
pub fn turn(ctx: &mut AppContext, shared: &SharedNetState, now: FirmwareInstant) {
    ctx.tick(now);
    if let Some(sample) = net::try_sample(shared) {
        ctx.apply_net_sample(sample);
    }
    ctx.advance(now);
    status::record_reset_armed(ctx.function.reset_indicated());
    ctx.refresh_indicators(now);
}
