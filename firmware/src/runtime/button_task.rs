//! Debounced button edge sources.
//!
//! One task per button waits on its EXTI line, settles for the debounce
//! window, and posts the level change as an edge event. Only level changes
//! are reported, so contact bounce inside the window collapses into a single
//! edge.

use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration as EmbassyDuration, Timer};

use lock_core::button::{ButtonEdge, ButtonId};
use lock_core::config::BUTTON_DEBOUNCE_PERIOD;
use lock_core::event::{Event, EventPayload};

use crate::app::{EventSender, post};

fn debounce_window() -> EmbassyDuration {
    let micros = u64::try_from(BUTTON_DEBOUNCE_PERIOD.as_micros()).unwrap_or(u64::MAX);
    EmbassyDuration::from_micros(micros)
}

// Buttons are wired active-low with the internal pull-up.
fn edge_from_level(is_low: bool) -> ButtonEdge {
    if is_low {
        ButtonEdge::Press
    } else {
        ButtonEdge::Release
    }
}

#[embassy_executor::task(pool_size = 3)]
pub async fn watch(mut input: ExtiInput<'static>, pin: ButtonId, sender: EventSender<'static>) -> ! {
    let debounce = debounce_window();
    let mut last = edge_from_level(input.is_low());

    loop {
        input.wait_for_any_edge().await;
        Timer::after(debounce).await;

        let edge = edge_from_level(input.is_low());
        if edge != last {
            last = edge;
            post(
                sender,
                Event::new(EventPayload::ButtonEdge { pin, action: edge }),
            );
        }
    }
}
